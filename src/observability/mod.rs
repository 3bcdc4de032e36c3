//! # Observability
//!
//! Logging setup for binaries and tests embedding the loader. The library
//! itself only emits `tracing` events; installing a subscriber is left to
//! the caller.

pub mod logging;

pub use logging::{init_logging, LogFormat};
