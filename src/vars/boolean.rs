use async_trait::async_trait;

use super::{Definition, Value, VarKind, Variable};
use crate::errors::ValidationError;

/// A boolean variable.
#[derive(Debug, Clone)]
pub struct BooleanVar {
    def: Definition<bool>,
}

/// Builder for [`BooleanVar`].
#[derive(Debug, Clone)]
pub struct BooleanVarBuilder {
    def: Definition<bool>,
}

impl BooleanVar {
    /// Starts a boolean variable definition. The name is upper-cased.
    pub fn define(name: &str) -> BooleanVarBuilder {
        BooleanVarBuilder { def: Definition::new(name) }
    }
}

impl BooleanVarBuilder {
    common_builder_methods!(bool);

    pub fn build(self) -> Result<BooleanVar, ValidationError> {
        self.def.check_name()?;
        Ok(BooleanVar { def: self.def })
    }
}

/// Parses the accepted boolean tokens, ignoring case:
/// `0 off false f no n` and `1 on true t yes y`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "0" | "off" | "false" | "f" | "no" | "n" => Some(false),
        "1" | "on" | "true" | "t" | "yes" | "y" => Some(true),
        _ => None,
    }
}

#[async_trait]
impl Variable for BooleanVar {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn kind(&self) -> VarKind {
        VarKind::Boolean
    }

    fn is_required(&self) -> bool {
        self.def.required
    }

    fn default_value(&self) -> Option<Value> {
        self.def.default.map(Value::Boolean)
    }

    async fn parse(&self, raw: &str) -> Result<Value, ValidationError> {
        let value = parse_bool(raw)
            .ok_or_else(|| ValidationError::invalid(&self.def.name, "is not a valid boolean"))?;
        self.def.finish(value).await.map(Value::Boolean)
    }
}
