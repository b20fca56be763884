//! # ulkb-kernel
//!
//! A higher-order logic proof kernel and theory manager.
//!
//! The kernel maintains an append-only logical theory (types,
//! constants, axioms, definitions, theorems) and exposes a small set of
//! primitive inference rules. The only way to produce a [`Sequent`] is
//! a successful rule application, so any sequent in hand is a checkable
//! witness of its own derivation.
//!
//! - [`ty`] - type constructors, hash-consed types, one-way matching
//! - [`term`] - locally nameless hash-consed terms with
//!   capture-avoiding substitution
//! - [`formula`] - the logical notation layer over terms of type `bool`
//! - [`sequent`] - sequents and proof certificates
//! - [`rule`] - the primitive inference rules
//! - [`extension`], [`theory`] - the extension log and its indices
//! - [`visit`] - child-first walker for exporter back-ends
//!
//! Derived rules and the conversion combinators live in `ulkb-proof`;
//! pretty printing and the AST converter live in `ulkb-syntax`.

pub mod error;
pub mod extension;
pub mod formula;
pub mod rule;
pub mod sequent;
pub mod settings;
pub mod term;
pub mod theory;
pub mod ty;
pub mod visit;

pub use error::{ArgumentError, Error, ExtensionError, KernelResult, LookupError, RuleError};
pub use extension::{Extension, ExtensionKind};
pub use sequent::{Proof, ProofArg, Sequent};
pub use settings::TheorySettings;
pub use term::{Substitution, Term, TermKind};
pub use theory::{current, ExtensionQuery, ResetPoint, Theory};
pub use ty::{
    bool_type, function_type, Associativity, Type, TypeConstructor, TypeInstantiation, TypeKind,
};
pub use ulkb_base::Symbol;
