//! Error types for the kernel.
//!
//! Every failure is raised at the earliest point it is detectable and
//! before any state is committed:
//!
//! - [`ArgumentError`] - an API received the wrong kind or shape of input
//! - [`RuleError`] - an inference rule's preconditions failed
//! - [`ExtensionError`] - the theory rejected an extension
//! - [`LookupError`] - a `lookup_*` query found nothing

use std::error;
use std::fmt;

/// An API received the wrong kind or shape of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentError {
    /// Name of the constructor or function that rejected its input.
    pub context: &'static str,
    /// What was wrong with it.
    pub reason: String,
}

impl ArgumentError {
    pub(crate) fn new(context: &'static str, reason: impl Into<String>) -> Self {
        ArgumentError {
            context,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad argument to '{}' ({})", self.context, self.reason)
    }
}

impl error::Error for ArgumentError {}

/// A primitive or derived rule's preconditions failed.
///
/// Carries the rule name and the reason, e.g. "not an equation" or
/// "variable occurs free in hypothesis".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    pub rule: &'static str,
    pub reason: String,
}

impl RuleError {
    pub fn new(rule: &'static str, reason: impl Into<String>) -> Self {
        RuleError {
            rule,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule, self.reason)
    }
}

impl error::Error for RuleError {}

/// `Theory::extend` rejected an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionError {
    /// Extension variant name, e.g. "NewDefinition".
    pub extension: &'static str,
    pub reason: String,
}

impl ExtensionError {
    pub(crate) fn new(extension: &'static str, reason: impl Into<String>) -> Self {
        ExtensionError {
            extension,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.extension, self.reason)
    }
}

impl error::Error for ExtensionError {}

/// A `lookup_*` query failed and no default was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupError {
    /// What was being looked up, e.g. "constant".
    pub target: &'static str,
    pub id: String,
}

impl LookupError {
    pub(crate) fn new(target: &'static str, id: impl Into<String>) -> Self {
        LookupError {
            target,
            id: id.into(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no such {} '{}'", self.target, self.id)
    }
}

impl error::Error for LookupError {}

/// Any kernel failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Argument(ArgumentError),
    Rule(RuleError),
    Extension(ExtensionError),
    Lookup(LookupError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Argument(err) => err.fmt(f),
            Error::Rule(err) => err.fmt(f),
            Error::Extension(err) => err.fmt(f),
            Error::Lookup(err) => err.fmt(f),
        }
    }
}

impl error::Error for Error {}

impl From<ArgumentError> for Error {
    fn from(err: ArgumentError) -> Error {
        Error::Argument(err)
    }
}

impl From<RuleError> for Error {
    fn from(err: RuleError) -> Error {
        Error::Rule(err)
    }
}

impl From<ExtensionError> for Error {
    fn from(err: ExtensionError) -> Error {
        Error::Extension(err)
    }
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Error {
        Error::Lookup(err)
    }
}

/// Result alias over the unified kernel [`Error`].
pub type KernelResult<T> = Result<T, Error>;
