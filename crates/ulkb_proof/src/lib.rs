//! # ulkb-proof
//!
//! Derived rules and conversion combinators over the `ulkb-kernel`
//! primitives.
//!
//! Nothing in this crate can fabricate a sequent: every constructor
//! here bottoms out in the kernel's primitive rules, so the soundness
//! guarantee of the kernel extends to the whole library.

pub mod conv;
pub mod derived;

pub use conv::{alpha_conv, beta_conv, Conv};
pub use derived::{
    alpha, alpha_rename, ap_term, ap_thm, cut, eq_truth_elim, eq_truth_intro, sym, truth, weaken,
};
