//! Derived rules and conversions working against a live theory.

use ulkb_kernel::error::RuleError;
use ulkb_kernel::formula::{equal, truth};
use ulkb_kernel::rule;
use ulkb_kernel::term::Term;
use ulkb_kernel::ty::{bool_type, function_type, Type};
use ulkb_kernel::Theory;
use ulkb_proof::{alpha_conv, beta_conv, cut, eq_truth_elim, eq_truth_intro, sym, weaken, Conv};

#[test]
fn axiom_sequents_feed_the_derived_rules() {
    let mut thy = Theory::new();
    thy.new_base_type("nat").unwrap();
    let nat = Type::base("nat");
    let zero = thy.new_constant("zero", &nat).unwrap();
    let succ = thy
        .new_constant("succ", &function_type(&nat, &nat))
        .unwrap();
    let one = Term::app(&succ, &zero).unwrap();
    thy.new_axiom("zero_fix", &equal(&zero, &one).unwrap()).unwrap();

    let ax = thy.lookup_axiom("zero_fix").unwrap().clone();
    let swapped = sym(&ax).unwrap();
    let (l, r) = swapped.conclusion().unpack_equal().unwrap();
    assert_eq!(*l, one);
    assert_eq!(*r, zero);
    assert!(swapped.hypotheses().is_empty());

    // Record the derived sequent and read it back.
    thy.new_theorem("fix_sym", &swapped).unwrap();
    assert_eq!(*thy.lookup_theorem("fix_sym").unwrap(), swapped);
}

#[test]
fn conversions_unfold_a_defined_constant() {
    let thy = Theory::new();
    let defining = thy.lookup_definition("true").unwrap().clone();
    // δ-style step: rewrite ⊤ by its defining equation.
    let unfold = Conv::new(move |t: &Term| {
        if t.is_truth() {
            Ok(defining.clone())
        } else {
            Err(RuleError::new("Unfold", format!("'{}' is not ⊤", t)))
        }
    });

    let s = unfold.apply(&truth()).unwrap();
    let (l, r) = s.conclusion().unpack_equal().unwrap();
    assert!(l.is_truth());
    assert!(r.is_equal());

    // The same conversion fails elsewhere, and try_ recovers.
    let p = Term::variable("p", &bool_type());
    assert!(unfold.apply(&p).is_err());
    let s = unfold.try_().apply(&p).unwrap();
    let (l, r) = s.conclusion().unpack_equal().unwrap();
    assert_eq!(l, r);

    // changed() refuses the identity fallback.
    assert!(unfold.try_().changed().apply(&p).is_err());
}

#[test]
fn beta_then_alpha_renames_through_equations() {
    let b = bool_type();
    let x = Term::variable("x", &b);
    let y = Term::variable("y", &b);
    let f = Term::constant("f", &function_type(&b, &b));

    // (λx. f x) y  beta-reduces to  f y
    let lam = Term::abs(&x, &Term::app(&f, &x).unwrap()).unwrap();
    let redex = Term::app(&lam, &y).unwrap();
    let s = beta_conv().apply(&redex).unwrap();
    let (_, contracted) = s.conclusion().unpack_equal().unwrap();
    assert_eq!(*contracted, Term::app(&f, &y).unwrap());

    // α-renaming an abstraction is the identity on the α-class.
    let s = alpha_conv(&y).apply(&lam).unwrap();
    let (l, r) = s.conclusion().unpack_equal().unwrap();
    assert_eq!(l, r);
}

#[test]
fn cut_weaken_and_truth_cooperate() {
    let thy = Theory::new();
    let b = bool_type();
    let p = Term::variable("p", &b);
    let q = Term::variable("q", &b);

    // 𝛤 = {q, p}: weaken an assumption, then cut the q away again.
    let sp = weaken(&q, &rule::assume(&p).unwrap()).unwrap();
    assert_eq!(sp.hypotheses().len(), 2);
    let sq = rule::assume(&q).unwrap();
    let cut_back = cut(&sq, &sp).unwrap();
    assert_eq!(*cut_back.conclusion(), p);
    assert!(cut_back.hypotheses().contains(&q));

    // p ⊢ p ↔ ⊤, and back again.
    let intro = eq_truth_intro(&thy, &rule::assume(&p).unwrap()).unwrap();
    let elim = eq_truth_elim(&thy, &intro).unwrap();
    assert_eq!(*elim.conclusion(), p);
    assert_eq!(elim.hypotheses().len(), 1);
}

#[test]
fn derived_certificates_bottom_out_in_primitives() {
    let a = Type::variable("a");
    let x = Term::variable("x", &a);
    let y = Term::variable("y", &a);
    let s = sym(&rule::assume(&equal(&x, &y).unwrap()).unwrap()).unwrap();
    let proof = s.proof().expect("recording is on by default");
    // Sym is not a primitive; its certificate is the EqMP tree it was
    // derived from.
    assert_eq!(proof.rule(), "EqMP");
}
