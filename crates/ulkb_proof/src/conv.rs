//! Conversion combinators.
//!
//! A [`Conv`] takes a term `t` and either returns an equational sequent
//! `⊢ t = t′` or fails with a [`RuleError`]. Combinators compose
//! conversions the HOL way: `then` (THENC) chains through transitivity,
//! `or_else` (ORELSEC) falls back on failure, `try_` never fails,
//! `repeat` (REPEATC) applies until failure with an explicit step
//! budget, since an always-succeeding inner conversion would never
//! terminate, and `changed` fails when nothing changed.

use std::rc::Rc;

use ulkb_kernel::error::RuleError;
use ulkb_kernel::rule::{self, RuleResult};
use ulkb_kernel::term::Term;

use crate::derived;

/// A term-to-equation function with clonable closure semantics.
#[derive(Clone)]
pub struct Conv(Rc<dyn Fn(&Term) -> RuleResult>);

impl Conv {
    pub fn new(f: impl Fn(&Term) -> RuleResult + 'static) -> Conv {
        Conv(Rc::new(f))
    }

    /// Applies the conversion to `t`.
    pub fn apply(&self, t: &Term) -> RuleResult {
        (self.0)(t)
    }

    /// Always succeeds with `⊢ t = t`.
    pub fn pass() -> Conv {
        Conv::new(|t| rule::refl(t))
    }

    /// Always fails.
    pub fn fail() -> Conv {
        Conv::new(|_| Err(RuleError::new("Conversion", "fail")))
    }

    /// Sequential composition: applies `self` giving `⊢ t = t′`, then
    /// `next` to `t′` giving `⊢ t′ = t″`, and joins by transitivity.
    pub fn then(&self, next: &Conv) -> Conv {
        let first = self.clone();
        let next = next.clone();
        Conv::new(move |t| {
            let s1 = first.apply(t)?;
            let (_, mid) = unpack_equation(s1.conclusion())?;
            let s2 = next.apply(&mid)?;
            rule::trans(&s1, &s2)
        })
    }

    /// Fallback: applies `self`, falling back to `other` on any
    /// failure.
    pub fn or_else(&self, other: &Conv) -> Conv {
        let first = self.clone();
        let other = other.clone();
        Conv::new(move |t| first.apply(t).or_else(|_| other.apply(t)))
    }

    /// `self` or the identity conversion.
    pub fn try_(&self) -> Conv {
        self.or_else(&Conv::pass())
    }

    /// Applies `self` until it fails, joining the steps by
    /// transitivity. Fails if the conversion still succeeds after
    /// `budget` steps.
    pub fn repeat(&self, budget: usize) -> Conv {
        let inner = self.clone();
        Conv::new(move |t| {
            let mut acc = rule::refl(t)?;
            let mut current = t.clone();
            for _ in 0..budget {
                match inner.apply(&current) {
                    Ok(step) => {
                        let (_, next) = unpack_equation(step.conclusion())?;
                        current = next.clone();
                        acc = rule::trans(&acc, &step)?;
                    }
                    Err(_) => return Ok(acc),
                }
            }
            if inner.apply(&current).is_err() {
                Ok(acc)
            } else {
                Err(RuleError::new("Repeat", "step budget exhausted"))
            }
        })
    }

    /// Applies `self` but fails when the two sides of the result are
    /// α-equal.
    pub fn changed(&self) -> Conv {
        let inner = self.clone();
        Conv::new(move |t| {
            let s = inner.apply(t)?;
            let (l, r) = unpack_equation(s.conclusion())?;
            if l == r {
                Err(RuleError::new("Changed", format!("'{}' did not change", t)))
            } else {
                Ok(s)
            }
        })
    }
}

fn unpack_equation(c: &Term) -> Result<(Term, Term), RuleError> {
    c.unpack_equal()
        .map(|(l, r)| (l.clone(), r.clone()))
        .ok_or_else(|| RuleError::new("Conversion", format!("'{}' is not an equation", c)))
}

/// Renames the binder: `λx. t` converts to `⊢ (λx. t) = (λy. t[x ≔ y])`.
pub fn alpha_conv(y: &Term) -> Conv {
    let y = y.clone();
    Conv::new(move |t| derived::alpha_rename(&y, t))
}

/// β-contraction of a redex.
pub fn beta_conv() -> Conv {
    Conv::new(|t| rule::beta(t))
}
