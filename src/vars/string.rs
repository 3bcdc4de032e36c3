use async_trait::async_trait;

use super::{Definition, Value, VarKind, Variable};
use crate::errors::ValidationError;

/// A free-form string variable with optional length bounds (inclusive,
/// counted in characters).
#[derive(Debug, Clone)]
pub struct StringVar {
    def: Definition<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

/// Builder for [`StringVar`].
#[derive(Debug, Clone)]
pub struct StringVarBuilder {
    def: Definition<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl StringVar {
    /// Starts a string variable definition. The name is upper-cased.
    pub fn define(name: &str) -> StringVarBuilder {
        StringVarBuilder { def: Definition::new(name), min_length: None, max_length: None }
    }
}

impl StringVarBuilder {
    common_builder_methods!(String);

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn build(self) -> Result<StringVar, ValidationError> {
        self.def.check_name()?;
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(ValidationError::definition(&self.def.name, "minLength > maxLength"));
            }
        }
        Ok(StringVar { def: self.def, min_length: self.min_length, max_length: self.max_length })
    }
}

#[async_trait]
impl Variable for StringVar {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn kind(&self) -> VarKind {
        VarKind::String
    }

    fn is_required(&self) -> bool {
        self.def.required
    }

    fn default_value(&self) -> Option<Value> {
        self.def.default.clone().map(Value::String)
    }

    async fn parse(&self, raw: &str) -> Result<Value, ValidationError> {
        let len = raw.chars().count();

        if let Some(min) = self.min_length {
            if len < min {
                return Err(ValidationError::invalid(
                    &self.def.name,
                    format!("is too short (minimum length is {})", min),
                ));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(ValidationError::invalid(
                    &self.def.name,
                    format!("is too long (maximum length is {})", max),
                ));
            }
        }

        self.def.finish(raw.to_string()).await.map(Value::String)
    }
}
