//! # vaultenv
//!
//! Typed, validated process configuration sourced from the environment and,
//! optionally, from a HashiCorp Vault server.
//!
//! ## Architecture
//!
//! ```text
//! VAULT_URL locator → auth method → login → secret paths ─┐
//!                                                          ├→ overlay → validation → republish
//!                                  process environment ───┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vaultenv::{BooleanVar, EnumVar, NumberVar, Options, Result, StringVar, VaultOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = Options::builder()
//!         .var(StringVar::define("DATABASE_HOST").default("127.0.0.1").build()?)
//!         .var(NumberVar::define("DATABASE_PORT").min(1).max(65535).integer().required().build()?)
//!         .var(EnumVar::define("DATABASE_TYPE").allowed(["mysql", "postgresql"]).build()?)
//!         .var(BooleanVar::define("DATABASE_USE_SSL").default(false).build()?)
//!         .vault(VaultOptions::default())
//!         .build();
//!
//!     let values = vaultenv::load(&options).await?;
//!     println!("{:?}", values.get("DATABASE_PORT"));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod env;
pub mod errors;
pub mod loader;
pub mod observability;
pub mod secrets;
pub mod validation;
pub mod vars;
pub mod vault;

// Re-export commonly used types and traits
pub use config::VaultOptions;
pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use errors::{Error, Result, ValidationError};
pub use loader::{load, EnvOverride, Loader, Options, OptionsBuilder};
pub use validation::{validate_values, Values};
pub use vars::{BooleanVar, EnumVar, NumberVar, StringVar, Value, VarKind, Variable};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
