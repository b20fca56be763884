//! End-to-end scenarios exercising the kernel through its public
//! surface: rules, theory commands, reset.

use ulkb_kernel::formula::{equal, falsity, truth};
use ulkb_kernel::rule;
use ulkb_kernel::term::{Term, Substitution};
use ulkb_kernel::ty::{bool_type, function_type, Type, TypeInstantiation};
use ulkb_kernel::{Error, ResetPoint, Theory};

/// Reflexivity followed by type instantiation: the equation's sides
/// pick up the instantiated annotations everywhere.
#[test]
fn refl_then_inst_type() {
    let a = Type::variable("a");
    let x = Term::variable("x", &a);
    let f = Term::constant("f", &function_type(&a, &a));
    let fx = Term::app(&f, &x).unwrap();

    let s = rule::refl(&fx).unwrap();
    assert!(s.hypotheses().is_empty());
    let (l, r) = s.conclusion().unpack_equal().unwrap();
    assert_eq!(l, r);

    let mut theta = TypeInstantiation::default();
    theta.insert(a.clone(), bool_type());
    let out = rule::inst_type(&theta, &s).unwrap();

    let fb = Term::constant("f", &function_type(&bool_type(), &bool_type()));
    let xb = Term::variable("x", &bool_type());
    let expected = Term::app(&fb, &xb).unwrap();
    let (l, r) = out.conclusion().unpack_equal().unwrap();
    assert_eq!(*l, expected);
    assert_eq!(*r, expected);
}

/// β-conversion of `(λx. x) y` yields `⊢ (λx. x) y = y` with no
/// hypotheses.
#[test]
fn beta_conversion() {
    let b = bool_type();
    let x = Term::variable("x", &b);
    let y = Term::variable("y", &b);
    let redex = Term::app(&Term::abs(&x, &x).unwrap(), &y).unwrap();
    let s = rule::beta(&redex).unwrap();
    assert!(s.hypotheses().is_empty());
    let (l, r) = s.conclusion().unpack_equal().unwrap();
    assert_eq!(*l, redex);
    assert_eq!(*r, y);
}

/// Transitivity through an assumed chain `x = y`, `y = g x k`.
#[test]
fn trans_through_assumptions() {
    let a = Type::variable("a");
    let x = Term::variable("x", &a);
    let y = Term::variable("y", &a);
    let k = Term::variable("k", &a);
    let g = Term::constant("g", &function_type(&a, &function_type(&a, &a)));
    let gxk = Term::app_many(&g, &[x.clone(), k.clone()]).unwrap();

    let e1 = equal(&x, &y).unwrap();
    let e2 = equal(&y, &gxk).unwrap();
    let s = rule::trans(
        &rule::assume(&e1).unwrap(),
        &rule::assume(&e2).unwrap(),
    )
    .unwrap();

    assert_eq!(s.hypotheses().len(), 2);
    assert!(s.hypotheses().contains(&e1));
    assert!(s.hypotheses().contains(&e2));
    let (l, r) = s.conclusion().unpack_equal().unwrap();
    assert_eq!(*l, x);
    assert_eq!(*r, gxk);
}

/// DeductAntisym builds `{x, y} ⊢ x ↔ y`; EqMP then recovers
/// `{x, y} ⊢ y`.
#[test]
fn deduct_antisym_then_eq_mp() {
    let b = bool_type();
    let x = Term::variable("x", &b);
    let y = Term::variable("y", &b);
    let bridge = rule::deduct_antisym(
        &rule::assume(&x).unwrap(),
        &rule::assume(&y).unwrap(),
    )
    .unwrap();
    assert_eq!(bridge.hypotheses().len(), 2);
    let (l, r) = bridge.conclusion().unpack_iff().unwrap();
    assert_eq!(*l, x);
    assert_eq!(*r, y);

    let out = rule::eq_mp(&bridge, &rule::assume(&x).unwrap()).unwrap();
    assert_eq!(*out.conclusion(), y);
    assert_eq!(out.hypotheses().len(), 2);
}

/// Defining a constant twice under the same name fails with an
/// extension error.
#[test]
fn definition_freshness() {
    let mut thy = Theory::new();
    let t = thy.new_definition("t", &truth()).unwrap();
    assert!(t.is_constant());
    assert_eq!(*t.ty(), bool_type());
    assert!(thy.lookup_extension("t").unwrap().is_new_definition());
    // The defining equation is indexed as a sealed sequent.
    let defining = thy.lookup_definition("t").unwrap();
    let (lhs, rhs) = defining.conclusion().unpack_equal().unwrap();
    assert_eq!(*lhs, t);
    assert!(rhs.is_truth());

    let again = thy.new_definition("t", &falsity());
    match again.unwrap_err() {
        Error::Extension(err) => assert!(err.reason.contains("already exists")),
        other => panic!("unexpected error: {}", other),
    }
}

/// Duplicate axioms collapse; reset(-1) rolls back to the digest
/// observed right after the first axiom.
#[test]
fn reset_after_duplicate_axiom() {
    let mut thy = Theory::new();
    let base = thy.len();

    thy.new_axiom_unnamed(&truth()).unwrap();
    let after_first = thy.digest();
    assert_eq!(thy.len(), base + 1);

    thy.new_axiom_unnamed(&falsity()).unwrap();
    assert_eq!(thy.len(), base + 2);

    // Structural duplicate of the first: silently merged.
    thy.new_axiom_unnamed(&truth()).unwrap();
    assert_eq!(thy.len(), base + 2);

    let removed = thy.reset(ResetPoint::Last(1)).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(thy.len(), base + 1);
    assert_eq!(thy.digest(), after_first);
}

/// Substitution through a sequent, end to end.
#[test]
fn subst_renames_across_the_turnstile() {
    let b = bool_type();
    let p = Term::variable("p", &b);
    let q = Term::variable("q", &b);
    let s = rule::assume(&p).unwrap();
    let mut theta = Substitution::default();
    theta.insert(p.clone(), q.clone());
    let out = rule::subst(&theta, &s).unwrap();
    assert_eq!(*out.conclusion(), q);
    assert!(out.hypotheses().contains(&q));
    assert_eq!(out.hypotheses().len(), 1);
}
