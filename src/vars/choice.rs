use async_trait::async_trait;

use super::{Definition, Value, VarKind, Variable};
use crate::errors::ValidationError;

/// A variable restricted to an ordered list of tokens. Matching ignores case
/// and yields the token as it was declared.
#[derive(Debug, Clone)]
pub struct EnumVar {
    def: Definition<String>,
    allowed: Vec<String>,
}

/// Builder for [`EnumVar`].
#[derive(Debug, Clone)]
pub struct EnumVarBuilder {
    def: Definition<String>,
    allowed: Vec<String>,
}

impl EnumVar {
    /// Starts an enum variable definition. The name is upper-cased.
    pub fn define(name: &str) -> EnumVarBuilder {
        EnumVarBuilder { def: Definition::new(name), allowed: Vec::new() }
    }

    /// Declared tokens, in declaration order.
    pub fn allowed_values(&self) -> &[String] {
        &self.allowed
    }
}

impl EnumVarBuilder {
    common_builder_methods!(String);

    /// Replaces the allowed token list.
    pub fn allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<EnumVar, ValidationError> {
        self.def.check_name()?;
        if self.allowed.is_empty() || self.allowed.iter().any(|v| v.is_empty()) {
            return Err(ValidationError::definition(&self.def.name, "allowed values"));
        }
        Ok(EnumVar { def: self.def, allowed: self.allowed })
    }
}

#[async_trait]
impl Variable for EnumVar {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn kind(&self) -> VarKind {
        VarKind::Enum
    }

    fn is_required(&self) -> bool {
        self.def.required
    }

    fn default_value(&self) -> Option<Value> {
        self.def.default.clone().map(Value::String)
    }

    async fn parse(&self, raw: &str) -> Result<Value, ValidationError> {
        let candidate = raw.to_uppercase();
        let canonical = self
            .allowed
            .iter()
            .find(|token| token.to_uppercase() == candidate)
            .ok_or_else(|| ValidationError::invalid(&self.def.name, "is not an allowed value"))?;

        self.def.finish(canonical.clone()).await.map(Value::String)
    }
}
