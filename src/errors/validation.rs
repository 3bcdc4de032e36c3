//! Variable validation errors.

use thiserror::Error;

/// Errors produced while turning raw strings into typed values.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required variable has no raw value.
    #[error("variable \"{name}\" is not defined")]
    Missing { name: String },

    /// The raw value failed a built-in check.
    #[error("variable \"{name}\" {reason}")]
    Invalid { name: String, reason: String },

    /// A custom validator rejected the value.
    #[error("variable \"{name}\" was rejected by its validator: {source}")]
    Rejected {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The descriptor itself is contradictory.
    #[error("invalid definition for variable \"{name}\" ({reason})")]
    Definition { name: String, reason: String },
}

impl ValidationError {
    /// Create a missing variable error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::Missing { name: name.into() }
    }

    /// Create an invalid value error.
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid { name: name.into(), reason: reason.into() }
    }

    /// Create a validator rejection error.
    pub fn rejected(name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Rejected { name: name.into(), source }
    }

    /// Create a definition error.
    pub fn definition(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Definition { name: name.into(), reason: reason.into() }
    }

    /// Name of the offending variable.
    pub fn variable(&self) -> &str {
        match self {
            Self::Missing { name }
            | Self::Invalid { name, .. }
            | Self::Rejected { name, .. }
            | Self::Definition { name, .. } => name,
        }
    }
}
