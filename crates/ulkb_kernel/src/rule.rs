//! The primitive inference rules.
//!
//! These constructors are the only way to fabricate a [`Sequent`]; a
//! well-formed sequent is therefore a checkable witness of a successful
//! derivation. Each rule checks its preconditions, fails with a
//! [`RuleError`] before any sequent is materialized, and observes
//! nothing beyond its inputs.
//!
//! The rule set is HOL Light's: ASSUME, REFL, TRANS, MK_COMB, ABS,
//! BETA_CONV, EQ_MP, DEDUCT_ANTISYM_RULE, INST_TYPE, INST.

use rustc_hash::FxHashSet;

use crate::error::RuleError;
use crate::formula::{equal, iff};
use crate::sequent::{ProofArg, Sequent};
use crate::term::{Substitution, Term};
use crate::ty::TypeInstantiation;

/// Result alias for rule applications.
pub type RuleResult = Result<Sequent, RuleError>;

fn union(a: &FxHashSet<Term>, b: &FxHashSet<Term>) -> FxHashSet<Term> {
    let mut out = a.clone();
    out.extend(b.iter().cloned());
    out
}

fn checked_formula(rule: &'static str, p: &Term) -> Result<Term, RuleError> {
    if p.is_formula() {
        Ok(p.clone())
    } else {
        Err(RuleError::new(rule, format!("'{}' is not a formula", p)))
    }
}

fn unpack_equation<'a>(rule: &'static str, c: &'a Term) -> Result<(&'a Term, &'a Term), RuleError> {
    c.unpack_equal()
        .ok_or_else(|| RuleError::new(rule, format!("'{}' is not an equation", c)))
}

fn assert_alpha_equal(rule: &'static str, t1: &Term, t2: &Term) -> Result<(), RuleError> {
    if t1 == t2 {
        Ok(())
    } else {
        Err(RuleError::new(
            rule,
            format!("'{}' and '{}' are not (alpha) equal", t1, t2),
        ))
    }
}

/// Assumption introduction: `p ⊢ p`.
pub fn assume(p: &Term) -> RuleResult {
    const RULE: &str = "Assume";
    let p = checked_formula(RULE, p)?;
    let mut hypotheses = FxHashSet::default();
    hypotheses.insert(p.clone());
    Ok(Sequent::derive(
        RULE,
        hypotheses,
        p.clone(),
        vec![ProofArg::Term(p)],
    ))
}

/// Reflexivity of equality: `⊢ t = t`.
pub fn refl(t: &Term) -> RuleResult {
    const RULE: &str = "Refl";
    let conclusion =
        equal(t, t).map_err(|err| RuleError::new(RULE, err.reason))?;
    Ok(Sequent::derive(
        RULE,
        FxHashSet::default(),
        conclusion,
        vec![ProofArg::Term(t.clone())],
    ))
}

/// Transitivity of equality: from `𝛤₁ ⊢ t₁ = t` and `𝛤₂ ⊢ t = t₂`,
/// derives `𝛤₁ ∪ 𝛤₂ ⊢ t₁ = t₂`.
pub fn trans(s1: &Sequent, s2: &Sequent) -> RuleResult {
    const RULE: &str = "Trans";
    let (l1, r1) = unpack_equation(RULE, s1.conclusion())?;
    let (l2, r2) = unpack_equation(RULE, s2.conclusion())?;
    assert_alpha_equal(RULE, r1, l2)?;
    let conclusion = equal(l1, r2).map_err(|err| RuleError::new(RULE, err.reason))?;
    Ok(Sequent::derive(
        RULE,
        union(s1.hypotheses(), s2.hypotheses()),
        conclusion,
        vec![s1.proof_arg(), s2.proof_arg()],
    ))
}

/// Equality of applications: from `𝛤₁ ⊢ f = g` and `𝛤₂ ⊢ t₁ = t₂`,
/// derives `𝛤₁ ∪ 𝛤₂ ⊢ f t₁ = g t₂`.
pub fn mk_comb(sf: &Sequent, sa: &Sequent) -> RuleResult {
    const RULE: &str = "MkComb";
    let (f, g) = unpack_equation(RULE, sf.conclusion())?;
    let (t1, t2) = unpack_equation(RULE, sa.conclusion())?;
    let applies = g
        .ty()
        .unpack_function_type()
        .is_some_and(|(domain, _)| domain.matches(t2.ty()));
    if !applies {
        return Err(RuleError::new(
            RULE,
            format!("cannot apply '{}' to '{}'", g, t2),
        ));
    }
    let left = Term::app(f, t1).map_err(|err| RuleError::new(RULE, err.reason))?;
    let right = Term::app(g, t2).map_err(|err| RuleError::new(RULE, err.reason))?;
    let conclusion = equal(&left, &right).map_err(|err| RuleError::new(RULE, err.reason))?;
    Ok(Sequent::derive(
        RULE,
        union(sf.hypotheses(), sa.hypotheses()),
        conclusion,
        vec![sf.proof_arg(), sa.proof_arg()],
    ))
}

/// Abstraction of equality: from `𝛤 ⊢ t₁ = t₂`, derives
/// `𝛤 ⊢ (λx. t₁) = (λx. t₂)`, provided `x` does not occur free in `𝛤`.
pub fn abs(x: &Term, s: &Sequent) -> RuleResult {
    const RULE: &str = "Abs";
    if !x.is_variable() {
        return Err(RuleError::new(RULE, format!("'{}' is not a variable", x)));
    }
    let (l, r) = unpack_equation(RULE, s.conclusion())?;
    for h in s.hypotheses() {
        if h.has_free_occurrence_of(x) {
            return Err(RuleError::new(
                RULE,
                format!("'{}' occurs free in hypothesis '{}'", x, h),
            ));
        }
    }
    let left = Term::abs(x, l).map_err(|err| RuleError::new(RULE, err.reason))?;
    let right = Term::abs(x, r).map_err(|err| RuleError::new(RULE, err.reason))?;
    let conclusion = equal(&left, &right).map_err(|err| RuleError::new(RULE, err.reason))?;
    Ok(Sequent::derive(
        RULE,
        s.hypotheses().clone(),
        conclusion,
        vec![ProofArg::Term(x.clone()), s.proof_arg()],
    ))
}

/// β-conversion: for a β-redex `(λx. t) u`, derives
/// `⊢ (λx. t) u = t[x ≔ u]`.
pub fn beta(e: &Term) -> RuleResult {
    const RULE: &str = "Beta";
    let Some((lam, u)) = e.unpack_beta_redex() else {
        return Err(RuleError::new(RULE, format!("'{}' is not a beta-redex", e)));
    };
    let Some((_, body)) = lam.unpack_abstraction_raw() else {
        return Err(RuleError::new(RULE, format!("'{}' is not a beta-redex", e)));
    };
    let contracted = body.close(u);
    let conclusion = equal(e, &contracted).map_err(|err| RuleError::new(RULE, err.reason))?;
    Ok(Sequent::derive(
        RULE,
        FxHashSet::default(),
        conclusion,
        vec![ProofArg::Term(e.clone())],
    ))
}

/// Equivalence elimination: from `𝛤₁ ⊢ p ↔ q` and `𝛤₂ ⊢ p`, derives
/// `𝛤₁ ∪ 𝛤₂ ⊢ q`.
pub fn eq_mp(s_eq: &Sequent, s_p: &Sequent) -> RuleResult {
    const RULE: &str = "EqMP";
    let Some((l, r)) = s_eq.conclusion().unpack_iff() else {
        return Err(RuleError::new(
            RULE,
            format!("'{}' is not an equivalence", s_eq.conclusion()),
        ));
    };
    assert_alpha_equal(RULE, l, s_p.conclusion())?;
    Ok(Sequent::derive(
        RULE,
        union(s_eq.hypotheses(), s_p.hypotheses()),
        r.clone(),
        vec![s_eq.proof_arg(), s_p.proof_arg()],
    ))
}

/// Equivalence introduction: from `𝛤₁ ⊢ p` and `𝛤₂ ⊢ q`, derives
/// `(𝛤₁ ⧵ {q}) ∪ (𝛤₂ ⧵ {p}) ⊢ p ↔ q`.
pub fn deduct_antisym(s1: &Sequent, s2: &Sequent) -> RuleResult {
    const RULE: &str = "DeductAntisym";
    let p = s1.conclusion();
    let q = s2.conclusion();
    let mut hypotheses: FxHashSet<Term> = s1
        .hypotheses()
        .iter()
        .filter(|h| *h != q)
        .cloned()
        .collect();
    hypotheses.extend(s2.hypotheses().iter().filter(|h| *h != p).cloned());
    let conclusion = iff(p, q).map_err(|err| RuleError::new(RULE, err.reason))?;
    Ok(Sequent::derive(
        RULE,
        hypotheses,
        conclusion,
        vec![s1.proof_arg(), s2.proof_arg()],
    ))
}

/// Type-variable instantiation: from `𝛤 ⊢ t`, derives `θ(𝛤) ⊢ θ(t)`.
pub fn inst_type(theta: &TypeInstantiation, s: &Sequent) -> RuleResult {
    const RULE: &str = "InstType";
    for (v, _) in theta {
        if !v.is_type_variable() {
            return Err(RuleError::new(
                RULE,
                format!("'{}' is not a type variable", v),
            ));
        }
    }
    let hypotheses = s
        .hypotheses()
        .iter()
        .map(|h| h.instantiate(theta))
        .collect();
    let conclusion = s.conclusion().instantiate(theta);
    let mut recorded: Vec<_> = theta.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    recorded.sort();
    Ok(Sequent::derive(
        RULE,
        hypotheses,
        conclusion,
        vec![ProofArg::TypeInstantiation(recorded), s.proof_arg()],
    ))
}

/// Free-variable substitution: from `𝛤 ⊢ t`, derives `θ(𝛤) ⊢ θ(t)`,
/// capture-avoiding.
pub fn subst(theta: &Substitution, s: &Sequent) -> RuleResult {
    const RULE: &str = "Subst";
    let conclusion = s
        .conclusion()
        .substitute(theta)
        .map_err(|err| RuleError::new(RULE, err.reason))?;
    let mut hypotheses = FxHashSet::default();
    for h in s.hypotheses() {
        hypotheses.insert(
            h.substitute(theta)
                .map_err(|err| RuleError::new(RULE, err.reason))?,
        );
    }
    let mut recorded: Vec<_> = theta.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    recorded.sort();
    Ok(Sequent::derive(
        RULE,
        hypotheses,
        conclusion,
        vec![ProofArg::Substitution(recorded), s.proof_arg()],
    ))
}

/// Axiom introduction: `⊢ p`, sealed by the theory when an axiom or
/// definition is installed. Not part of the public rule surface.
pub(crate) fn axiom(p: &Term) -> RuleResult {
    const RULE: &str = "Axiom";
    let p = checked_formula(RULE, p)?;
    Ok(Sequent::derive(
        RULE,
        FxHashSet::default(),
        p.clone(),
        vec![ProofArg::Term(p)],
    ))
}

/// External acceptance: `⊢ p`, recording only that `p` was accepted.
///
/// This is the door through which solver-backed rules and importers
/// hand sequents to the kernel; no validation of the producer's
/// reasoning happens here, and the certificate leaf names the rule
/// "Accept" so the provenance stays visible.
pub fn accept(p: &Term) -> RuleResult {
    const RULE: &str = "Accept";
    let p = checked_formula(RULE, p)?;
    Ok(Sequent::derive(
        RULE,
        FxHashSet::default(),
        p.clone(),
        vec![ProofArg::Term(p)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{falsity, truth};
    use crate::term::Term;
    use crate::ty::{bool_type, function_type, Type};

    fn b() -> Type {
        bool_type()
    }

    #[test]
    fn assume_requires_a_formula() {
        let p = Term::variable("p", &b());
        let s = assume(&p).unwrap();
        assert_eq!(s.hypotheses().len(), 1);
        assert!(s.hypotheses().contains(&p));
        assert_eq!(*s.conclusion(), p);

        let nat = Type::base("nat");
        let n = Term::variable("n", &nat);
        let err = assume(&n).unwrap_err();
        assert_eq!(err.rule, "Assume");
    }

    #[test]
    fn refl_yields_a_reflexive_equation() {
        let x = Term::variable("x", &Type::variable("a"));
        let s = refl(&x).unwrap();
        assert!(s.hypotheses().is_empty());
        let (l, r) = s.conclusion().unpack_equal().unwrap();
        assert_eq!(l, r);
        assert_eq!(*l, x);
    }

    #[test]
    fn trans_chains_equations() {
        let a = Type::variable("a");
        let x = Term::variable("x", &a);
        let y = Term::variable("y", &a);
        let z = Term::variable("z", &a);
        let s1 = assume(&crate::formula::equal(&x, &y).unwrap()).unwrap();
        let s2 = assume(&crate::formula::equal(&y, &z).unwrap()).unwrap();
        let s = trans(&s1, &s2).unwrap();
        assert_eq!(s.hypotheses().len(), 2);
        let (l, r) = s.conclusion().unpack_equal().unwrap();
        assert_eq!(*l, x);
        assert_eq!(*r, z);
    }

    #[test]
    fn trans_rejects_mismatched_pivots() {
        let a = Type::variable("a");
        let x = Term::variable("x", &a);
        let y = Term::variable("y", &a);
        let z = Term::variable("z", &a);
        let s1 = assume(&crate::formula::equal(&x, &y).unwrap()).unwrap();
        let s2 = assume(&crate::formula::equal(&z, &x).unwrap()).unwrap();
        let err = trans(&s1, &s2).unwrap_err();
        assert!(err.reason.contains("not (alpha) equal"));
    }

    #[test]
    fn trans_rejects_non_equations() {
        let p = Term::variable("p", &b());
        let sp = assume(&p).unwrap();
        let err = trans(&sp, &sp).unwrap_err();
        assert!(err.reason.contains("not an equation"));
    }

    #[test]
    fn mk_comb_applies_equal_functions() {
        let a = Type::variable("a");
        let f = Term::constant("f", &function_type(&a, &a));
        let x = Term::variable("x", &a);
        let sf = refl(&f).unwrap();
        let sx = refl(&x).unwrap();
        let s = mk_comb(&sf, &sx).unwrap();
        let (l, r) = s.conclusion().unpack_equal().unwrap();
        assert_eq!(l, r);
        assert_eq!(*l, Term::app(&f, &x).unwrap());
    }

    #[test]
    fn mk_comb_rejects_ill_typed_application() {
        let f = Term::constant("f", &function_type(&b(), &b()));
        let nat = Type::base("nat");
        let n = Term::variable("n", &nat);
        let err = mk_comb(&refl(&f).unwrap(), &refl(&n).unwrap()).unwrap_err();
        assert!(err.reason.contains("cannot apply"));
    }

    #[test]
    fn abs_rejects_free_hypothesis_variables() {
        let x = Term::variable("x", &b());
        let s = assume(&crate::formula::equal(&x, &x).unwrap()).unwrap();
        let err = abs(&x, &s).unwrap_err();
        assert!(err.reason.contains("occurs free in hypothesis"));

        let y = Term::variable("y", &b());
        let s = refl(&y).unwrap();
        let out = abs(&x, &s).unwrap();
        let (l, r) = out.conclusion().unpack_equal().unwrap();
        assert!(l.is_abstraction());
        assert_eq!(l, r);
    }

    #[test]
    fn beta_contracts_redexes() {
        let x = Term::variable("x", &b());
        let y = Term::variable("y", &b());
        let id = Term::abs(&x, &x).unwrap();
        let redex = Term::app(&id, &y).unwrap();
        let s = beta(&redex).unwrap();
        assert!(s.hypotheses().is_empty());
        let (l, r) = s.conclusion().unpack_equal().unwrap();
        assert_eq!(*l, redex);
        assert_eq!(*r, y);

        let err = beta(&y).unwrap_err();
        assert!(err.reason.contains("not a beta-redex"));
    }

    #[test]
    fn eq_mp_eliminates_equivalences() {
        let p = Term::variable("p", &b());
        let q = Term::variable("q", &b());
        let s_iff = assume(&crate::formula::iff(&p, &q).unwrap()).unwrap();
        let s_p = assume(&p).unwrap();
        let s = eq_mp(&s_iff, &s_p).unwrap();
        assert_eq!(*s.conclusion(), q);
        assert_eq!(s.hypotheses().len(), 2);

        let err = eq_mp(&s_p, &s_p).unwrap_err();
        assert!(err.reason.contains("not an equivalence"));
    }

    #[test]
    fn deduct_antisym_discharges_each_conclusion() {
        let p = Term::variable("p", &b());
        let q = Term::variable("q", &b());
        let s = deduct_antisym(&assume(&p).unwrap(), &assume(&q).unwrap()).unwrap();
        // {p} \ {q} ∪ {q} \ {p} = {p, q}
        assert_eq!(s.hypotheses().len(), 2);
        let (l, r) = s.conclusion().unpack_iff().unwrap();
        assert_eq!(*l, p);
        assert_eq!(*r, q);
    }

    #[test]
    fn inst_type_instantiates_both_sides_of_the_turnstile() {
        let a = Type::variable("a");
        let x = Term::variable("x", &a);
        let y = Term::variable("y", &a);
        let s = assume(&crate::formula::equal(&x, &y).unwrap()).unwrap();
        let mut theta = TypeInstantiation::default();
        theta.insert(a.clone(), b());
        let out = inst_type(&theta, &s).unwrap();
        let xb = Term::variable("x", &b());
        let yb = Term::variable("y", &b());
        let expected = crate::formula::equal(&xb, &yb).unwrap();
        assert_eq!(*out.conclusion(), expected);
        assert!(out.hypotheses().contains(&expected));
    }

    #[test]
    fn inst_type_rejects_non_variable_keys() {
        let p = Term::variable("p", &b());
        let s = assume(&p).unwrap();
        let mut theta = TypeInstantiation::default();
        theta.insert(b(), b());
        assert!(inst_type(&theta, &s).is_err());
    }

    #[test]
    fn subst_applies_to_hypotheses_and_conclusion() {
        let p = Term::variable("p", &b());
        let q = Term::variable("q", &b());
        let s = assume(&p).unwrap();
        let mut theta = Substitution::default();
        theta.insert(p.clone(), q.clone());
        let out = subst(&theta, &s).unwrap();
        assert_eq!(*out.conclusion(), q);
        assert!(out.hypotheses().contains(&q));
        assert!(!out.hypotheses().contains(&p));
    }

    #[test]
    fn axiom_seals_a_formula() {
        let s = axiom(&truth()).unwrap();
        assert!(s.hypotheses().is_empty());
        assert!(s.conclusion().is_truth());
        assert!(axiom(&Term::variable("n", &Type::base("nat"))).is_err());
        let _ = falsity();
    }
}
