//! # Variable Descriptors
//!
//! A descriptor declares one expected configuration key: its name, whether it
//! is required, an optional default, kind-specific constraints and an optional
//! custom validator. Descriptors are built once with a per-kind builder and
//! are immutable afterwards.
//!
//! ```rust,ignore
//! use vaultenv::{NumberVar, StringVar};
//!
//! let port = NumberVar::define("database_port").min(1).max(65535).integer().build()?;
//! let host = StringVar::define("DATABASE_HOST").default("127.0.0.1").build()?;
//! assert_eq!(port.name(), "DATABASE_PORT");
//! ```

/// Builder methods every kind shares.
macro_rules! common_builder_methods {
    ($value:ty) => {
        /// Marks the variable as required.
        pub fn required(mut self) -> Self {
            self.def.required = true;
            self
        }

        /// Value used when the variable is absent. Defaults bypass
        /// constraints and validators.
        pub fn default(mut self, value: impl Into<$value>) -> Self {
            self.def.default = Some(value.into());
            self
        }

        /// Installs a synchronous validator receiving `(value, name)`.
        pub fn validator<F>(mut self, f: F) -> Self
        where
            F: Fn($value, &str) -> anyhow::Result<$value> + Send + Sync + 'static,
        {
            self.def.validator = Some($crate::vars::Validator::from_fn(f));
            self
        }

        /// Installs an asynchronous validator receiving `(value, name)`.
        pub fn async_validator<F, Fut>(mut self, f: F) -> Self
        where
            F: Fn($value, String) -> Fut + Send + Sync + 'static,
            Fut: std::future::Future<Output = anyhow::Result<$value>> + Send + 'static,
        {
            self.def.validator = Some($crate::vars::Validator::from_async(f));
            self
        }
    };
}

mod boolean;
mod choice;
mod number;
mod string;
mod value;

pub use boolean::{parse_bool, BooleanVar, BooleanVarBuilder};
pub use choice::{EnumVar, EnumVarBuilder};
pub use number::{NumberVar, NumberVarBuilder};
pub use string::{StringVar, StringVarBuilder};
pub use value::{Value, VarKind};

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::errors::ValidationError;

/// Common capability of every descriptor kind.
#[async_trait]
pub trait Variable: Send + Sync + fmt::Debug {
    /// Upper-cased variable name.
    fn name(&self) -> &str;

    /// Kind of value this descriptor produces.
    fn kind(&self) -> VarKind;

    /// Whether a missing raw value aborts validation.
    fn is_required(&self) -> bool;

    /// Value emitted, unvalidated, when the raw value is absent.
    fn default_value(&self) -> Option<Value>;

    /// Coerces and checks a raw value, then runs the custom validator.
    async fn parse(&self, raw: &str) -> Result<Value, ValidationError>;
}

type ValidatorFn<T> = dyn Fn(T, String) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync;

/// Caller-supplied check run after the built-in constraints. Its result
/// replaces the value.
pub struct Validator<T>(Arc<ValidatorFn<T>>);

impl<T: Send + 'static> Validator<T> {
    pub(crate) fn from_fn<F>(f: F) -> Self
    where
        F: Fn(T, &str) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self(Arc::new(move |value: T, name: String| -> BoxFuture<'static, anyhow::Result<T>> {
            let result = f(value, &name);
            Box::pin(futures::future::ready(result))
        }))
    }

    pub(crate) fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(T, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self(Arc::new(move |value: T, name: String| -> BoxFuture<'static, anyhow::Result<T>> {
            Box::pin(f(value, name))
        }))
    }

    pub(crate) async fn run(&self, value: T, name: &str) -> Result<T, ValidationError> {
        (self.0)(value, name.to_string()).await.map_err(|e| ValidationError::rejected(name, e))
    }
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// Settings shared by every kind.
#[derive(Debug, Clone)]
pub(crate) struct Definition<T> {
    pub(crate) name: String,
    pub(crate) required: bool,
    pub(crate) default: Option<T>,
    pub(crate) validator: Option<Validator<T>>,
}

impl<T: Send + 'static> Definition<T> {
    pub(crate) fn new(name: &str) -> Self {
        Self { name: name.trim().to_uppercase(), required: false, default: None, validator: None }
    }

    pub(crate) fn check_name(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::definition("", "name cannot be empty"));
        }
        Ok(())
    }

    pub(crate) async fn finish(&self, value: T) -> Result<T, ValidationError> {
        match &self.validator {
            Some(validator) => validator.run(value, &self.name).await,
            None => Ok(value),
        }
    }
}
