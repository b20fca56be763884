//! Error type of the serialization layer.

use std::error;
use std::fmt;

/// A conversion to or from the AST encoding failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstError {
    /// A required tag key was absent.
    MissingField(String),
    /// The class tag named no known object kind.
    InvalidClass(String),
    /// Anything else wrong with the input.
    Malformed(String),
}

impl AstError {
    pub(crate) fn missing_field(field: &str) -> AstError {
        AstError::MissingField(field.to_owned())
    }

    pub(crate) fn invalid_class(class: &str) -> AstError {
        AstError::InvalidClass(class.to_owned())
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> AstError {
        AstError::Malformed(reason.into())
    }
}

impl fmt::Display for AstError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstError::MissingField(field) => {
                write!(f, "missing required field '{}'", field)
            }
            AstError::InvalidClass(class) => write!(f, "invalid class '{}'", class),
            AstError::Malformed(reason) => f.write_str(reason),
        }
    }
}

impl error::Error for AstError {}
