use async_trait::async_trait;

use super::{Definition, Value, VarKind, Variable};
use crate::errors::ValidationError;

/// A numeric variable with optional inclusive bounds and an integer
/// requirement.
#[derive(Debug, Clone)]
pub struct NumberVar {
    def: Definition<f64>,
    min: Option<f64>,
    max: Option<f64>,
    integer: bool,
}

/// Builder for [`NumberVar`].
#[derive(Debug, Clone)]
pub struct NumberVarBuilder {
    def: Definition<f64>,
    min: Option<f64>,
    max: Option<f64>,
    integer: bool,
}

impl NumberVar {
    /// Starts a numeric variable definition. The name is upper-cased.
    pub fn define(name: &str) -> NumberVarBuilder {
        NumberVarBuilder { def: Definition::new(name), min: None, max: None, integer: false }
    }
}

impl NumberVarBuilder {
    common_builder_methods!(f64);

    pub fn min(mut self, value: impl Into<f64>) -> Self {
        self.min = Some(value.into());
        self
    }

    pub fn max(mut self, value: impl Into<f64>) -> Self {
        self.max = Some(value.into());
        self
    }

    /// Rejects values with a fractional part.
    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn build(self) -> Result<NumberVar, ValidationError> {
        self.def.check_name()?;
        for (label, bound) in [("min", self.min), ("max", self.max)] {
            if bound.is_some_and(|v| !v.is_finite()) {
                return Err(ValidationError::definition(
                    &self.def.name,
                    format!("value of {}", label),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ValidationError::definition(&self.def.name, "min > max"));
            }
        }
        Ok(NumberVar { def: self.def, min: self.min, max: self.max, integer: self.integer })
    }
}

#[async_trait]
impl Variable for NumberVar {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn kind(&self) -> VarKind {
        VarKind::Number
    }

    fn is_required(&self) -> bool {
        self.def.required
    }

    fn default_value(&self) -> Option<Value> {
        self.def.default.map(Value::Number)
    }

    async fn parse(&self, raw: &str) -> Result<Value, ValidationError> {
        let expected = if self.integer { "is not a valid integer" } else { "is not a valid number" };

        let value = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ValidationError::invalid(&self.def.name, expected))?;

        if self.integer && value.fract() != 0.0 {
            return Err(ValidationError::invalid(&self.def.name, expected));
        }

        if let Some(min) = self.min {
            if value < min {
                return Err(ValidationError::invalid(
                    &self.def.name,
                    format!("is less than {}", min),
                ));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ValidationError::invalid(
                    &self.def.name,
                    format!("is greater than {}", max),
                ));
            }
        }

        self.def.finish(value).await.map(Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port() -> NumberVar {
        NumberVar::define("DATABASE_PORT").min(1).max(65535).integer().build().unwrap()
    }

    #[tokio::test]
    async fn test_valid_port() {
        assert_eq!(port().parse("5432").await.unwrap(), Value::Number(5432.0));
        assert_eq!(port().parse(" 1 ").await.unwrap(), Value::Number(1.0));
        assert_eq!(port().parse("65535").await.unwrap(), Value::Number(65535.0));
    }

    #[tokio::test]
    async fn test_out_of_range() {
        let err = port().parse("5432543").await.unwrap_err();
        assert!(err.to_string().contains("greater than 65535"), "{}", err);

        let err = port().parse("0").await.unwrap_err();
        assert!(err.to_string().contains("less than 1"), "{}", err);
    }

    #[tokio::test]
    async fn test_fraction_rejected_when_integer() {
        let err = port().parse("5432.3").await.unwrap_err();
        assert!(err.to_string().contains("not a valid integer"), "{}", err);
    }

    #[tokio::test]
    async fn test_fraction_accepted_otherwise() {
        let ratio = NumberVar::define("SAMPLE_RATIO").min(0).max(1).build().unwrap();
        assert_eq!(ratio.parse("0.25").await.unwrap(), Value::Number(0.25));
    }

    #[tokio::test]
    async fn test_non_numeric_rejected() {
        let any = NumberVar::define("WORKERS").build().unwrap();
        for raw in ["", "abc", "12abc", "NaN", "inf"] {
            let err = any.parse(raw).await.unwrap_err();
            assert!(err.to_string().contains("not a valid number"), "{}: {}", raw, err);
        }
    }

    #[tokio::test]
    async fn test_validator_runs_after_constraints() {
        let var = NumberVar::define("WORKERS")
            .max(8)
            .validator(|value, _| Ok(value * 2.0))
            .build()
            .unwrap();
        assert_eq!(var.parse("4").await.unwrap(), Value::Number(8.0));
        assert!(var.parse("9").await.is_err());
    }

    #[test]
    fn test_contradictory_bounds_rejected() {
        let err = NumberVar::define("PORT").min(10).max(1).build().unwrap_err();
        assert!(err.to_string().contains("min > max"));

        assert!(NumberVar::define("PORT").min(f64::NAN).build().is_err());
    }
}
