//! The formula layer.
//!
//! A formula is a term of type `bool`. This module provides the logical
//! notation: the primitive equality constant, the defined constants
//! (truth, falsity, negation, conjunction, disjunction, implication,
//! quantifiers) with their defining equations, and the predicate and
//! destructor family over that notation.
//!
//! The constants here are plain terms; the theory prelude records the
//! corresponding extensions (see `Theory::new`).

use once_cell::sync::Lazy;
use ulkb_base::Symbol;

use crate::error::ArgumentError;
use crate::term::Term;
use crate::ty::{bool_type, function_type, Type, TypeInstantiation};

/// The primitive equality constant `equal : a → a → bool`.
pub static EQUAL: Lazy<Term> = Lazy::new(|| {
    let a = Type::variable("a");
    Term::constant("equal", &function_type(&a, &function_type(&a, &bool_type())))
});

/// `true : bool`, defined by `(λp:bool. p) = (λp:bool. p)`.
pub static TRUTH: Lazy<Term> = Lazy::new(|| Term::constant("true", &bool_type()));

/// `false : bool`, defined by `∀p:bool. p`.
pub static FALSITY: Lazy<Term> = Lazy::new(|| Term::constant("false", &bool_type()));

/// `not : bool → bool`.
pub static NOT: Lazy<Term> =
    Lazy::new(|| Term::constant("not", &function_type(&bool_type(), &bool_type())));

fn binary_connective(id: &str) -> Term {
    Term::constant(
        id,
        &function_type(&bool_type(), &function_type(&bool_type(), &bool_type())),
    )
}

/// `and : bool → bool → bool`.
pub static AND: Lazy<Term> = Lazy::new(|| binary_connective("and"));

/// `or : bool → bool → bool`.
pub static OR: Lazy<Term> = Lazy::new(|| binary_connective("or"));

/// `implies : bool → bool → bool`.
pub static IMPLIES: Lazy<Term> = Lazy::new(|| binary_connective("implies"));

fn quantifier(id: &str) -> Term {
    let a = Type::variable("a");
    Term::constant(
        id,
        &function_type(&function_type(&a, &bool_type()), &bool_type()),
    )
}

/// `forall : (a → bool) → bool`.
pub static FORALL: Lazy<Term> = Lazy::new(|| quantifier("forall"));

/// `exists : (a → bool) → bool`.
pub static EXISTS: Lazy<Term> = Lazy::new(|| quantifier("exists"));

/// `exists1 : (a → bool) → bool`.
pub static EXISTS1: Lazy<Term> = Lazy::new(|| quantifier("exists1"));

// -- Constructors ----------------------------------------------------------

/// The equation `l = r`.
pub fn equal(l: &Term, r: &Term) -> Result<Term, ArgumentError> {
    Term::app_many(&EQUAL, &[l.clone(), r.clone()])
}

/// The equivalence `p ↔ q` (equality on formulas).
pub fn iff(p: &Term, q: &Term) -> Result<Term, ArgumentError> {
    check_formula("Iff", p)?;
    check_formula("Iff", q)?;
    equal(p, q)
}

/// The true formula `⊤`.
pub fn truth() -> Term {
    TRUTH.clone()
}

/// The false formula `⊥`.
pub fn falsity() -> Term {
    FALSITY.clone()
}

/// The negation `¬p`.
pub fn not(p: &Term) -> Result<Term, ArgumentError> {
    check_formula("Not", p)?;
    Term::app(&NOT, p)
}

/// The conjunction `p ∧ q`.
pub fn and(p: &Term, q: &Term) -> Result<Term, ArgumentError> {
    connective("And", &AND, p, q)
}

/// The disjunction `p ∨ q`.
pub fn or(p: &Term, q: &Term) -> Result<Term, ArgumentError> {
    connective("Or", &OR, p, q)
}

/// The implication `p → q`.
pub fn implies(p: &Term, q: &Term) -> Result<Term, ArgumentError> {
    connective("Implies", &IMPLIES, p, q)
}

/// The universal quantification `∀x. p`.
pub fn forall(x: &Term, p: &Term) -> Result<Term, ArgumentError> {
    binder("Forall", &FORALL, x, p)
}

/// The existential quantification `∃x. p`.
pub fn exists(x: &Term, p: &Term) -> Result<Term, ArgumentError> {
    binder("Exists", &EXISTS, x, p)
}

/// The unique existential quantification `∃!x. p`.
pub fn exists1(x: &Term, p: &Term) -> Result<Term, ArgumentError> {
    binder("Exists1", &EXISTS1, x, p)
}

/// Right-folded conjunction `p₁ ∧ (p₂ ∧ (… ∧ pₙ))`.
pub fn and_many(ps: &[Term]) -> Result<Term, ArgumentError> {
    fold_connective("And", &AND, ps)
}

/// Right-folded disjunction.
pub fn or_many(ps: &[Term]) -> Result<Term, ArgumentError> {
    fold_connective("Or", &OR, ps)
}

/// Right-folded implication `p₁ → (p₂ → (… → pₙ))`.
pub fn implies_many(ps: &[Term]) -> Result<Term, ArgumentError> {
    fold_connective("Implies", &IMPLIES, ps)
}

/// Right-folded universal quantification over several variables.
pub fn forall_many(xs: &[Term], p: &Term) -> Result<Term, ArgumentError> {
    fold_binder("Forall", forall, xs, p)
}

/// Right-folded existential quantification over several variables.
pub fn exists_many(xs: &[Term], p: &Term) -> Result<Term, ArgumentError> {
    fold_binder("Exists", exists, xs, p)
}

/// Chained equality: `eq_chain([x, y, z])` is `x = y ∧ y = z`.
pub fn eq_chain(ts: &[Term]) -> Result<Term, ArgumentError> {
    chain("Equal", ts, |l, r| equal(l, r))
}

/// Chained distinctness: `ne_chain([x, y, z])` is `¬(x = y) ∧ ¬(y = z)`.
pub fn ne_chain(ts: &[Term]) -> Result<Term, ArgumentError> {
    chain("Distinct", ts, |l, r| not(&equal(l, r)?))
}

fn fold_connective(
    context: &'static str,
    c: &Term,
    ps: &[Term],
) -> Result<Term, ArgumentError> {
    let Some((last, init)) = ps.split_last() else {
        return Err(ArgumentError::new(context, "expected at least one formula"));
    };
    let mut out = last.clone();
    for p in init.iter().rev() {
        out = connective(context, c, p, &out)?;
    }
    check_formula(context, &out)?;
    Ok(out)
}

fn fold_binder(
    context: &'static str,
    one: fn(&Term, &Term) -> Result<Term, ArgumentError>,
    xs: &[Term],
    p: &Term,
) -> Result<Term, ArgumentError> {
    if xs.is_empty() {
        return Err(ArgumentError::new(context, "expected at least one variable"));
    }
    let mut out = p.clone();
    for x in xs.iter().rev() {
        out = one(x, &out)?;
    }
    Ok(out)
}

fn chain(
    context: &'static str,
    ts: &[Term],
    pair: impl Fn(&Term, &Term) -> Result<Term, ArgumentError>,
) -> Result<Term, ArgumentError> {
    if ts.len() < 2 {
        return Err(ArgumentError::new(context, "expected at least two terms"));
    }
    let mut links = Vec::with_capacity(ts.len() - 1);
    for pair_window in ts.windows(2) {
        links.push(pair(&pair_window[0], &pair_window[1])?);
    }
    and_many(&links)
}

fn check_formula(context: &'static str, p: &Term) -> Result<(), ArgumentError> {
    if p.is_formula() {
        Ok(())
    } else {
        Err(ArgumentError::new(
            context,
            format!("'{}' is not a formula", p),
        ))
    }
}

fn connective(
    context: &'static str,
    c: &Term,
    p: &Term,
    q: &Term,
) -> Result<Term, ArgumentError> {
    check_formula(context, p)?;
    check_formula(context, q)?;
    Term::app_many(c, &[p.clone(), q.clone()])
}

/// Applies a quantifier constant `c : (a → bool) → bool` to the
/// abstraction of `x` over `p`, instantiating `a` to `x`'s type first.
fn binder(context: &'static str, c: &Term, x: &Term, p: &Term) -> Result<Term, ArgumentError> {
    if !x.is_variable() {
        return Err(ArgumentError::new(
            context,
            format!("'{}' is not a variable", x),
        ));
    }
    check_formula(context, p)?;
    let a = c
        .ty()
        .unpack_function_type()
        .and_then(|(dom, _)| dom.unpack_function_type())
        .map(|(a, _)| a.clone());
    let c = match a {
        Some(a) if a.is_type_variable() => {
            let mut theta = TypeInstantiation::default();
            theta.insert(a, x.ty().clone());
            c.instantiate(&theta)
        }
        _ => c.clone(),
    };
    Term::app(&c, &Term::abs(x, p)?)
}

// -- Predicates and destructors --------------------------------------------

static EQUAL_ID: Lazy<Symbol> = Lazy::new(|| Symbol::intern("equal"));
static FORALL_ID: Lazy<Symbol> = Lazy::new(|| Symbol::intern("forall"));
static EXISTS_ID: Lazy<Symbol> = Lazy::new(|| Symbol::intern("exists"));
static EXISTS1_ID: Lazy<Symbol> = Lazy::new(|| Symbol::intern("exists1"));

fn unpack_connective<'a>(t: &'a Term, c: &Term) -> Option<(&'a Term, &'a Term)> {
    let (fun, r) = t.unpack_application()?;
    let (head, l) = fun.unpack_application()?;
    if *head == *c {
        Some((l, r))
    } else {
        None
    }
}

impl Term {
    /// A formula is a term of type `bool`.
    pub fn is_formula(&self) -> bool {
        self.ty().is_bool_type()
    }

    pub fn is_equal(&self) -> bool {
        self.unpack_equal().is_some()
    }

    /// Left- and right-hand sides of an equation.
    pub fn unpack_equal(&self) -> Option<(&Term, &Term)> {
        let (fun, r) = self.unpack_application()?;
        let (c, l) = fun.unpack_application()?;
        if c.is_constant() && c.id() == Some(*EQUAL_ID) {
            Some((l, r))
        } else {
            None
        }
    }

    /// An equivalence is an equation between formulas.
    pub fn is_iff(&self) -> bool {
        self.unpack_iff().is_some()
    }

    pub fn unpack_iff(&self) -> Option<(&Term, &Term)> {
        let (l, r) = self.unpack_equal()?;
        if l.is_formula() && r.is_formula() {
            Some((l, r))
        } else {
            None
        }
    }

    pub fn is_truth(&self) -> bool {
        *self == *TRUTH
    }

    pub fn is_falsity(&self) -> bool {
        *self == *FALSITY
    }

    pub fn is_not(&self) -> bool {
        self.unpack_not().is_some()
    }

    pub fn unpack_not(&self) -> Option<&Term> {
        let (fun, p) = self.unpack_application()?;
        if *fun == *NOT {
            Some(p)
        } else {
            None
        }
    }

    pub fn is_and(&self) -> bool {
        self.unpack_and().is_some()
    }

    pub fn unpack_and(&self) -> Option<(&Term, &Term)> {
        unpack_connective(self, &AND)
    }

    pub fn is_or(&self) -> bool {
        self.unpack_or().is_some()
    }

    pub fn unpack_or(&self) -> Option<(&Term, &Term)> {
        unpack_connective(self, &OR)
    }

    pub fn is_implies(&self) -> bool {
        self.unpack_implies().is_some()
    }

    pub fn unpack_implies(&self) -> Option<(&Term, &Term)> {
        unpack_connective(self, &IMPLIES)
    }

    pub fn is_forall(&self) -> bool {
        self.unpack_quantified(*FORALL_ID).is_some()
    }

    /// Bound variable and body of a universal quantification.
    pub fn unpack_forall(&self) -> Option<(Term, Term)> {
        self.unpack_quantified(*FORALL_ID)
    }

    pub fn is_exists(&self) -> bool {
        self.unpack_quantified(*EXISTS_ID).is_some()
    }

    pub fn unpack_exists(&self) -> Option<(Term, Term)> {
        self.unpack_quantified(*EXISTS_ID)
    }

    pub fn is_exists1(&self) -> bool {
        self.unpack_quantified(*EXISTS1_ID).is_some()
    }

    pub fn unpack_exists1(&self) -> Option<(Term, Term)> {
        self.unpack_quantified(*EXISTS1_ID)
    }

    /// Quantifier applications are recognized by the head constant's id:
    /// the constant itself occurs instantiated at the bound variable's
    /// type.
    fn unpack_quantified(&self, id: Symbol) -> Option<(Term, Term)> {
        let (fun, arg) = self.unpack_application()?;
        if fun.is_constant() && fun.id() == Some(id) {
            arg.unpack_abstraction()
        } else {
            None
        }
    }
}

// -- Propositional normalization -------------------------------------------

/// Simplifies a formula by the unit laws of ⊤ and ⊥ and double
/// negation, bottom-up.
pub fn simplify(p: &Term) -> Result<Term, ArgumentError> {
    let out = if let Some(q) = p.unpack_not() {
        not(&simplify(q)?)?
    } else if let Some((q, r)) = p.unpack_and() {
        and(&simplify(q)?, &simplify(r)?)?
    } else if let Some((q, r)) = p.unpack_or() {
        or(&simplify(q)?, &simplify(r)?)?
    } else if let Some((q, r)) = p.unpack_implies() {
        implies(&simplify(q)?, &simplify(r)?)?
    } else if let Some((q, r)) = p.unpack_iff() {
        iff(&simplify(q)?, &simplify(r)?)?
    } else {
        return Ok(p.clone());
    };
    simplify_step(&out)
}

fn simplify_step(p: &Term) -> Result<Term, ArgumentError> {
    if let Some(q) = p.unpack_not() {
        if q.is_truth() {
            return Ok(falsity());
        } else if q.is_falsity() {
            return Ok(truth());
        } else if let Some(r) = q.unpack_not() {
            return Ok(r.clone());
        }
    } else if let Some((q, r)) = p.unpack_and() {
        if q.is_truth() {
            return Ok(r.clone());
        } else if r.is_truth() {
            return Ok(q.clone());
        } else if q.is_falsity() || r.is_falsity() {
            return Ok(falsity());
        }
    } else if let Some((q, r)) = p.unpack_or() {
        if q.is_falsity() {
            return Ok(r.clone());
        } else if r.is_falsity() {
            return Ok(q.clone());
        } else if q.is_truth() || r.is_truth() {
            return Ok(truth());
        }
    } else if let Some((q, r)) = p.unpack_implies() {
        if q.is_truth() {
            return Ok(r.clone());
        } else if q.is_falsity() || r.is_truth() {
            return Ok(truth());
        }
    } else if let Some((q, r)) = p.unpack_iff() {
        if q.is_truth() {
            return Ok(r.clone());
        } else if r.is_truth() {
            return Ok(q.clone());
        } else if q.is_falsity() {
            return not(r);
        } else if r.is_falsity() {
            return not(q);
        }
    }
    Ok(p.clone())
}

/// Negation normal form of the propositional skeleton: negations pushed
/// to the atoms, implications and equivalences expanded.
pub fn nnf(p: &Term) -> Result<Term, ArgumentError> {
    nnf_rec(&simplify(p)?)
}

fn nnf_rec(p: &Term) -> Result<Term, ArgumentError> {
    if let Some(q) = p.unpack_not() {
        if let Some(r) = q.unpack_not() {
            return nnf_rec(r);
        } else if let Some((l, r)) = q.unpack_and() {
            return or(&nnf_rec(&not(l)?)?, &nnf_rec(&not(r)?)?);
        } else if let Some((l, r)) = q.unpack_or() {
            return and(&nnf_rec(&not(l)?)?, &nnf_rec(&not(r)?)?);
        } else if let Some((l, r)) = q.unpack_implies() {
            return and(&nnf_rec(l)?, &nnf_rec(&not(r)?)?);
        } else if let Some((l, r)) = q.unpack_iff() {
            return or(
                &and(&nnf_rec(l)?, &nnf_rec(&not(r)?)?)?,
                &and(&nnf_rec(&not(l)?)?, &nnf_rec(r)?)?,
            );
        }
    } else if let Some((l, r)) = p.unpack_and() {
        return and(&nnf_rec(l)?, &nnf_rec(r)?);
    } else if let Some((l, r)) = p.unpack_or() {
        return or(&nnf_rec(l)?, &nnf_rec(r)?);
    } else if let Some((l, r)) = p.unpack_implies() {
        return or(&nnf_rec(&not(l)?)?, &nnf_rec(r)?);
    } else if let Some((l, r)) = p.unpack_iff() {
        return or(
            &and(&nnf_rec(l)?, &nnf_rec(r)?)?,
            &and(&nnf_rec(&not(l)?)?, &nnf_rec(&not(r)?)?)?,
        );
    }
    Ok(p.clone())
}

// -- Defining equations (used by the theory prelude) -----------------------

/// The definientia of the prelude constants, in installation order.
pub(crate) mod definiens {
    use super::*;

    /// `(λp:bool. p) = (λp:bool. p)`
    pub fn truth() -> Result<Term, ArgumentError> {
        let p = Term::variable("p", &bool_type());
        let id = Term::abs(&p, &p)?;
        equal(&id, &id)
    }

    /// `λp q. (λf:bool→bool→bool. f p q) = (λf. f ⊤ ⊤)`
    pub fn and() -> Result<Term, ArgumentError> {
        let p = Term::variable("p", &bool_type());
        let q = Term::variable("q", &bool_type());
        let f = Term::variable(
            "f",
            &function_type(&bool_type(), &function_type(&bool_type(), &bool_type())),
        );
        let lhs = Term::abs(&f, &Term::app_many(&f, &[p.clone(), q.clone()])?)?;
        let rhs = Term::abs(&f, &Term::app_many(&f, &[super::truth(), super::truth()])?)?;
        Term::abs_many(&[p, q], &equal(&lhs, &rhs)?)
    }

    /// `λp q. (p ∧ q) ↔ p`
    pub fn implies() -> Result<Term, ArgumentError> {
        let p = Term::variable("p", &bool_type());
        let q = Term::variable("q", &bool_type());
        Term::abs_many(&[p.clone(), q.clone()], &iff(&super::and(&p, &q)?, &p)?)
    }

    /// `λP:(a→bool). P = (λx:a. ⊤)`
    pub fn forall() -> Result<Term, ArgumentError> {
        let a = Type::variable("a");
        let p = Term::variable("p", &function_type(&a, &bool_type()));
        let x = Term::variable("x", &a);
        let always_true = Term::abs(&x, &super::truth())?;
        Term::abs(&p, &equal(&p, &always_true)?)
    }

    /// `∀p:bool. p`
    pub fn falsity() -> Result<Term, ArgumentError> {
        let p = Term::variable("p", &bool_type());
        super::forall(&p, &p)
    }

    /// `λp. p → ⊥`
    pub fn not() -> Result<Term, ArgumentError> {
        let p = Term::variable("p", &bool_type());
        Term::abs(&p, &super::implies(&p, &super::falsity())?)
    }

    /// `λp q. ∀r. (p → r) → ((q → r) → r)`
    pub fn or() -> Result<Term, ArgumentError> {
        let p = Term::variable("p", &bool_type());
        let q = Term::variable("q", &bool_type());
        let r = Term::variable("r", &bool_type());
        let body = super::implies(
            &super::implies(&p, &r)?,
            &super::implies(&super::implies(&q, &r)?, &r)?,
        )?;
        Term::abs_many(&[p.clone(), q.clone()], &super::forall(&r, &body)?)
    }

    /// `λP:(a→bool). ∀q. (∀x. P x → q) → q`
    pub fn exists() -> Result<Term, ArgumentError> {
        let a = Type::variable("a");
        let p = Term::variable("p", &function_type(&a, &bool_type()));
        let q = Term::variable("q", &bool_type());
        let x = Term::variable("x", &a);
        let px = Term::app(&p, &x)?;
        let premise = super::forall(&x, &super::implies(&px, &q)?)?;
        Term::abs(&p, &super::forall(&q, &super::implies(&premise, &q)?)?)
    }

    /// `λP. (∃ P) ∧ (∀x y. P x ∧ P y → x = y)`
    pub fn exists1() -> Result<Term, ArgumentError> {
        let a = Type::variable("a");
        let p = Term::variable("p", &function_type(&a, &bool_type()));
        let x = Term::variable("x", &a);
        let y = Term::variable("y", &a);
        let some = Term::app(&EXISTS, &p)?;
        let px = Term::app(&p, &x)?;
        let py = Term::app(&p, &y)?;
        let unique = super::forall(
            &x,
            &super::forall(
                &y,
                &super::implies(&super::and(&px, &py)?, &equal(&x, &y)?)?,
            )?,
        )?;
        Term::abs(&p, &super::and(&some, &unique)?)
    }
}
