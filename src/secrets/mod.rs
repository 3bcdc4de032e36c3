//! Redacting wrappers for credential material.
//!
//! Access tokens, AppRole secret ids, service-account JWTs and cloud session
//! credentials pass through the loader wrapped in [`SecretString`] so they
//! cannot reach logs or error messages by accident.

mod types;

pub use types::SecretString;
