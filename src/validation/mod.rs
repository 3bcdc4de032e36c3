//! # Validation Engine
//!
//! Turns a raw `name -> string` map into typed [`Value`]s using a list of
//! [`Variable`] descriptors. Descriptors are processed in list order and the
//! first failure aborts the whole call: callers never observe a partially
//! validated map.
//!
//! For each descriptor:
//! 1. a present raw value is coerced, constraint-checked and handed to the
//!    custom validator, whose result is authoritative;
//! 2. an absent value on a required descriptor fails with
//!    [`ValidationError::Missing`];
//! 3. an absent value with a default yields the default as is;
//! 4. otherwise the key is omitted.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::errors::ValidationError;
use crate::vars::{Value, Variable};

/// Typed output of a load, keyed by upper-cased variable name.
pub type Values = HashMap<String, Value>;

/// Validates `raw` against `vars`.
#[instrument(skip_all, fields(vars = vars.len()))]
pub async fn validate_values(
    raw: &HashMap<String, String>,
    vars: &[Arc<dyn Variable>],
) -> Result<Values, ValidationError> {
    let mut values = Values::with_capacity(vars.len());

    for var in vars {
        let name = var.name();
        match raw.get(name) {
            Some(raw_value) => {
                let value = var.parse(raw_value).await?;
                values.insert(name.to_string(), value);
            }
            None if var.is_required() => return Err(ValidationError::missing(name)),
            None => match var.default_value() {
                Some(default) => {
                    debug!(variable = %name, "using default value");
                    values.insert(name.to_string(), default);
                }
                None => debug!(variable = %name, "optional variable not set"),
            },
        }
    }

    Ok(values)
}
