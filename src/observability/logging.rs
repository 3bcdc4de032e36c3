//! # Structured Logging
//!
//! Events carry structured fields (method, mount path, path count, status).
//! Access tokens, secret ids, JWTs and secret values are never recorded; they
//! travel as [`crate::secrets::SecretString`], which redacts itself.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Output format for [`init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Installs a global fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Calling this when a subscriber is already installed is a no-op.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder().with_env_filter(filter);

    // Already set elsewhere (e.g. integration tests).
    let _ = match format {
        LogFormat::Plain => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
}

/// Create a tracing span for a secrets-store operation.
///
/// ```rust,ignore
/// let span = vault_span!("login", locator.host, method = %kind);
/// ```
#[macro_export]
macro_rules! vault_span {
    ($operation:expr, $host:expr) => {
        tracing::info_span!(
            "vault_operation",
            operation = %$operation,
            host = %$host
        )
    };
    ($operation:expr, $host:expr, $($field:tt)*) => {
        tracing::info_span!(
            "vault_operation",
            operation = %$operation,
            host = %$host,
            $($field)*
        )
    };
}
