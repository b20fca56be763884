//! # ulkb-base
//!
//! Structural atoms for the ulkb logic kernel.
//!
//! This crate provides the foundational types used throughout ulkb:
//!
//! - [`Symbol`]/[`intern`] - string interning for O(1) identifier equality
//! - [`digest`] - SHA-256 content digests of object dumps
//!
//! It has no knowledge of logic, types, or terms; higher-level crates
//! build on this generic infrastructure.

pub mod digest;
pub mod intern;

pub use intern::Symbol;
