//! Derived rules.
//!
//! Everything here bottoms out in the kernel's primitive rules; no
//! sequent is fabricated directly. The derivations follow HOL Light
//! (PROVE_HYP, AP_TERM, AP_THM, SYM, ALPHA, ALPHA_CONV, EQT_INTRO,
//! EQT_ELIM).

use ulkb_kernel::error::RuleError;
use ulkb_kernel::rule::{self, RuleResult};
use ulkb_kernel::term::{Substitution, Term};
use ulkb_kernel::theory::Theory;
use ulkb_kernel::Sequent;

fn unpack_equation<'a>(rule: &'static str, c: &'a Term) -> Result<(&'a Term, &'a Term), RuleError> {
    c.unpack_equal()
        .ok_or_else(|| RuleError::new(rule, format!("'{}' is not an equation", c)))
}

/// Cut: from `𝛤₁ ⊢ p` and `𝛤₂ ⊢ q`, derives `𝛤₁ ∪ (𝛤₂ ⧵ {p}) ⊢ q`.
///
/// The interesting case is when `p ∈ 𝛤₂`.
pub fn cut(s1: &Sequent, s2: &Sequent) -> RuleResult {
    rule::eq_mp(
        &rule::deduct_antisym(
            s1, // 1. 𝛤₁ ⊢ p
            s2, // 2. 𝛤₂ ⊢ q
        )?, // 3. (𝛤₁-{q}) ∪ (𝛤₂-{p}) ⊢ p ↔ q
        s1, // 4. 𝛤₁ ⊢ p
    ) // 5. (𝛤₁-{q}) ∪ (𝛤₂-{p}) ⊢ q, by EqMP(3,4)
}

/// Weakening: from `𝛤 ⊢ p`, derives `𝛤 ∪ {q} ⊢ p`.
pub fn weaken(q: &Term, s: &Sequent) -> RuleResult {
    cut(
        &rule::assume(q)?, // 1. q ⊢ q
        s,                 // 2. 𝛤 ⊢ p
    ) // 3. {q} ∪ (𝛤-{q}) ⊢ p
}

/// Application of a term to an equality theorem: from `𝛤 ⊢ t₁ = t₂`,
/// derives `𝛤 ⊢ f t₁ = f t₂`.
pub fn ap_term(f: &Term, s: &Sequent) -> RuleResult {
    rule::mk_comb(
        &rule::refl(f)?, // 1. ⊢ f = f
        s,               // 2. 𝛤 ⊢ t₁ = t₂
    ) // 3. 𝛤 ⊢ f t₁ = f t₂, by MkComb(1,2)
}

/// Application of an equality theorem to a term: from `𝛤 ⊢ f = g`,
/// derives `𝛤 ⊢ f t = g t`.
pub fn ap_thm(s: &Sequent, t: &Term) -> RuleResult {
    rule::mk_comb(
        s,               // 1. 𝛤 ⊢ f = g
        &rule::refl(t)?, // 2. ⊢ t = t
    ) // 3. 𝛤 ⊢ f t = g t, by MkComb(1,2)
}

/// Symmetry of equality: from `𝛤 ⊢ t₁ = t₂`, derives `𝛤 ⊢ t₂ = t₁`.
pub fn sym(s: &Sequent) -> RuleResult {
    let c = s.conclusion();
    let (t1, _) = unpack_equation("Sym", c)?;
    // The head `= t₁` is the partially applied equality constant.
    let eq_head = c
        .unpack_application()
        .and_then(|(fun, _)| fun.unpack_application())
        .map(|(head, _)| head)
        .ok_or_else(|| RuleError::new("Sym", format!("'{}' is not an equation", c)))?;
    rule::eq_mp(
        &rule::mk_comb(
            &ap_term(
                eq_head, s, // 1. 𝛤 ⊢ t₁ = t₂
            )?, // 2. 𝛤 ⊢ (= t₁) = (= t₂), by ApTerm(=,1)
            &rule::refl(t1)?, // 3. ⊢ t₁ = t₁
        )?, // 4. 𝛤 ⊢ (t₁ = t₁) = (t₂ = t₁), by MkComb(2,3)
        &rule::refl(t1)?, // 5. ⊢ t₁ = t₁
    ) // 6. 𝛤 ⊢ t₂ = t₁, by EqMP(4,5)
}

/// Equality of α-convertible terms: `⊢ t₁ = t₂` when `t₁ ≡α t₂`,
/// joined from two reflexivities.
pub fn alpha(t1: &Term, t2: &Term) -> RuleResult {
    rule::trans(
        &rule::refl(t1)?, // 1. ⊢ t₁ = t₁
        &rule::refl(t2)?, // 2. ⊢ t₂ = t₂
    ) // 3. ⊢ t₁ = t₂, by Trans(1,2); fails unless t₁ ≡α t₂
}

/// α-conversion: `⊢ (λx. t) = (λy. t[x ≔ y])`, provided `y` does not
/// occur free in `t` (or `y = x`).
pub fn alpha_rename(y: &Term, lam: &Term) -> RuleResult {
    const RULE: &str = "AlphaRename";
    if !y.is_variable() {
        return Err(RuleError::new(RULE, format!("'{}' is not a variable", y)));
    }
    let Some((x, t)) = lam.unpack_abstraction() else {
        return Err(RuleError::new(
            RULE,
            format!("'{}' is not an abstraction", lam),
        ));
    };
    if *y != x && t.has_free_occurrence_of(y) {
        return Err(RuleError::new(
            RULE,
            format!("'{}' occurs free in '{}'", y, lam),
        ));
    }
    let renamed = if *y == x {
        lam.clone()
    } else {
        let y = y.variant(|v| *v != x && t.has_occurrence_of(v));
        let mut theta = Substitution::default();
        theta.insert(x.clone(), y.clone());
        let body = t
            .substitute(&theta)
            .map_err(|err| RuleError::new(RULE, err.reason))?;
        Term::abs(&y, &body).map_err(|err| RuleError::new(RULE, err.reason))?
    };
    alpha(lam, &renamed)
}

/// Truth: `⊢ ⊤`, from the definition of `true` in `thy`.
pub fn truth(thy: &Theory) -> RuleResult {
    const RULE: &str = "Truth";
    let definition = thy
        .lookup_definition("true")
        .map_err(|err| RuleError::new(RULE, err.to_string()))?;
    // definition: ⊢ true = ((λp. p) = (λp. p))
    let (_, definiens) = unpack_equation(RULE, definition.conclusion())?;
    let (_, identity) = unpack_equation(RULE, definiens)?;
    rule::eq_mp(
        &sym(definition)?,      // 1. ⊢ ((λp. p) = (λp. p)) ↔ ⊤
        &rule::refl(identity)?, // 2. ⊢ (λp. p) = (λp. p)
    ) // 3. ⊢ ⊤, by EqMP(1,2)
}

/// Introduction of equality with truth: from `𝛤 ⊢ p`, derives
/// `𝛤 ⊢ p ↔ ⊤`.
pub fn eq_truth_intro(thy: &Theory, s: &Sequent) -> RuleResult {
    let top = ulkb_kernel::formula::truth();
    if s.hypotheses().contains(&top) {
        weaken(
            &top,
            &rule::deduct_antisym(
                s,                   // 1. 𝛤,⊤ ⊢ p
                &rule::assume(&top)?, // 2. ⊤ ⊢ ⊤
            )?, // 3. (𝛤,⊤-{⊤}) ∪ (⊤-{p}) ⊢ p ↔ ⊤
        ) // 4. 𝛤 ∪ {⊤} ⊢ p ↔ ⊤
    } else {
        rule::deduct_antisym(
            s,            // 1. 𝛤 ⊢ p
            &truth(thy)?, // 2. ⊢ ⊤
        ) // 3. (𝛤-{⊤}) ∪ (∅-{p}) ⊢ p ↔ ⊤
    }
}

/// Elimination of equality with truth: from `𝛤 ⊢ p ↔ ⊤`, derives
/// `𝛤 ⊢ p`.
pub fn eq_truth_elim(thy: &Theory, s: &Sequent) -> RuleResult {
    rule::eq_mp(
        &sym(s)?,     // 1. 𝛤 ⊢ ⊤ ↔ p
        &truth(thy)?, // 2. ⊢ ⊤
    ) // 3. 𝛤 ⊢ p, by EqMP(1,2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulkb_kernel::formula::{equal, truth as top};
    use ulkb_kernel::ty::{bool_type, function_type, Type};

    fn b() -> Type {
        bool_type()
    }

    #[test]
    fn cut_discharges_the_cut_formula() {
        let p = Term::variable("p", &b());
        let q = Term::variable("q", &b());
        let s1 = rule::assume(&p).unwrap();
        // {p, q} ⊢ q, with p among the hypotheses
        let s2 = weaken(&p, &rule::assume(&q).unwrap()).unwrap();
        let s = cut(&s1, &s2).unwrap();
        assert_eq!(*s.conclusion(), q);
        assert!(s.hypotheses().contains(&p));
        assert!(s.hypotheses().contains(&q));
    }

    #[test]
    fn weaken_adds_a_hypothesis() {
        let p = Term::variable("p", &b());
        let q = Term::variable("q", &b());
        let s = weaken(&q, &rule::assume(&p).unwrap()).unwrap();
        assert_eq!(*s.conclusion(), p);
        assert_eq!(s.hypotheses().len(), 2);
    }

    #[test]
    fn ap_term_and_ap_thm_wrap_mk_comb() {
        let a = Type::variable("a");
        let f = Term::constant("f", &function_type(&a, &a));
        let x = Term::variable("x", &a);
        let y = Term::variable("y", &a);
        let s = rule::assume(&equal(&x, &y).unwrap()).unwrap();
        let out = ap_term(&f, &s).unwrap();
        let (l, r) = out.conclusion().unpack_equal().unwrap();
        assert_eq!(*l, Term::app(&f, &x).unwrap());
        assert_eq!(*r, Term::app(&f, &y).unwrap());

        let g = Term::variable("g", &function_type(&a, &a));
        let h = Term::variable("h", &function_type(&a, &a));
        let s = rule::assume(&equal(&g, &h).unwrap()).unwrap();
        let out = ap_thm(&s, &x).unwrap();
        let (l, r) = out.conclusion().unpack_equal().unwrap();
        assert_eq!(*l, Term::app(&g, &x).unwrap());
        assert_eq!(*r, Term::app(&h, &x).unwrap());
    }

    #[test]
    fn sym_swaps_an_equation() {
        let a = Type::variable("a");
        let x = Term::variable("x", &a);
        let y = Term::variable("y", &a);
        let e = equal(&x, &y).unwrap();
        let s = sym(&rule::assume(&e).unwrap()).unwrap();
        let (l, r) = s.conclusion().unpack_equal().unwrap();
        assert_eq!(*l, y);
        assert_eq!(*r, x);
        // The hypothesis is still the original equation.
        assert!(s.hypotheses().contains(&e));
    }

    #[test]
    fn alpha_requires_alpha_equal_terms() {
        let x = Term::variable("x", &b());
        let y = Term::variable("y", &b());
        let lx = Term::abs(&x, &x).unwrap();
        let ly = Term::abs(&y, &y).unwrap();
        let s = alpha(&lx, &ly).unwrap();
        assert!(s.hypotheses().is_empty());
        assert!(s.conclusion().is_equal());
        assert!(alpha(&x, &y).is_err());
    }

    #[test]
    fn alpha_rename_renames_the_binder() {
        let x = Term::variable("x", &b());
        let y = Term::variable("y", &b());
        let lam = Term::abs(&x, &x).unwrap();
        let s = alpha_rename(&y, &lam).unwrap();
        let (l, r) = s.conclusion().unpack_equal().unwrap();
        assert_eq!(l, r);
        assert_eq!(*l, lam);
    }

    #[test]
    fn alpha_rename_rejects_capturing_names() {
        let not_ = Term::constant("n", &function_type(&b(), &b()));
        let x = Term::variable("x", &b());
        let y = Term::variable("y", &b());
        // λx. n y: renaming the binder to y would capture the free y.
        let lam = Term::abs(&x, &Term::app(&not_, &y).unwrap()).unwrap();
        let err = alpha_rename(&y, &lam).unwrap_err();
        assert!(err.reason.contains("occurs free"));
    }

    #[test]
    fn truth_is_provable_from_the_prelude() {
        let thy = Theory::new();
        let s = truth(&thy).unwrap();
        assert!(s.hypotheses().is_empty());
        assert!(s.conclusion().is_truth());
    }

    #[test]
    fn eq_truth_round_trip() {
        let thy = Theory::new();
        let p = Term::variable("p", &b());
        let sp = rule::assume(&p).unwrap();
        let intro = eq_truth_intro(&thy, &sp).unwrap();
        let (l, r) = intro.conclusion().unpack_iff().unwrap();
        assert_eq!(*l, p);
        assert!(r.is_truth());
        let back = eq_truth_elim(&thy, &intro).unwrap();
        assert_eq!(*back.conclusion(), p);
        assert!(back.hypotheses().contains(&p));
    }

    #[test]
    fn eq_truth_intro_with_truth_hypothesis() {
        let thy = Theory::new();
        let p = Term::variable("p", &b());
        let s = weaken(&top(), &rule::assume(&p).unwrap()).unwrap();
        let out = eq_truth_intro(&thy, &s).unwrap();
        let (l, r) = out.conclusion().unpack_iff().unwrap();
        assert_eq!(*l, p);
        assert!(r.is_truth());
        assert!(out.hypotheses().contains(&top()));
    }
}
