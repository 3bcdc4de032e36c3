use std::path::PathBuf;

use thiserror::Error;

/// TLS-specific error variants surfaced while loading store TLS material.
#[derive(Debug, Error)]
pub enum TlsError {
    /// A client certificate was supplied without its private key.
    #[error("client certificate is configured but the private key is not")]
    MissingPrivateKey,

    /// A private key was supplied without its client certificate.
    #[error("private key is configured but the client certificate is not")]
    MissingCertificate,

    /// A PEM file named by an environment variable could not be read.
    #[error("failed to read {what} at {}: {source}", path.display())]
    ReadError {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PEM contents were rejected by the TLS backend.
    #[error("{what} is not a valid PEM: {source}")]
    InvalidPem {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },
}
