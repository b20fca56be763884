//! # ulkb-syntax
//!
//! Serialization for ulkb kernel objects:
//!
//! - [`printer`] - deterministic, settings-driven pretty printing with
//!   ASCII and Unicode symbol tables
//! - [`ast`] - tagged-record (JSON) interchange with configurable tag
//!   keys and an exact round-trip property
//!
//! Sequents deserialized from AST are re-sealed through the kernel's
//! rules; this crate cannot fabricate one directly.

pub mod ast;
pub mod error;
pub mod printer;

pub use ast::AstSettings;
pub use error::AstError;
pub use printer::PrinterSettings;
