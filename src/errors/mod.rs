//! # Error Handling
//!
//! Error types for configuration loading. Every failure surfaces to the
//! caller of [`crate::load`] as a single [`Error`]; nothing is retried or
//! swallowed here apart from the cases documented on the secret fetcher.

mod tls;
mod validation;

pub use tls::TlsError;
pub use validation::ValidationError;

/// Custom result type for vaultenv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vaultenv
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid options, malformed locator, missing auth parameters.
    /// Always raised before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Method detection, login rejection, or a missing token
    #[error("Unable to log in to Vault [{message}]")]
    Auth { message: String },

    /// Reading a secret path failed
    #[error("Unable to read secrets from Vault [{message}]")]
    Retrieval { message: String },

    /// A variable failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// TLS material could not be loaded
    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    /// Network transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth { message: message.into() }
    }

    /// Create a new retrieval error
    pub fn retrieval<S: Into<String>>(message: S) -> Self {
        Self::Retrieval { message: message.into() }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Whether this error was raised before any network activity
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Tls(_) | Self::Io { .. })
    }
}
