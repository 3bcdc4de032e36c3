use serde::Serialize;
use std::fmt;

/// Descriptor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    String,
    Number,
    Enum,
    Boolean,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Enum => "enum",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Canonical text written back to the environment: strings verbatim,
    /// numbers in shortest base-10 form, booleans as `TRUE`/`FALSE`.
    pub fn to_env_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_string_forms() {
        assert_eq!(Value::from("127.0.0.1").to_env_string(), "127.0.0.1");
        assert_eq!(Value::Number(5432.0).to_env_string(), "5432");
        assert_eq!(Value::Number(0.25).to_env_string(), "0.25");
        assert_eq!(Value::Number(-3.0).to_env_string(), "-3");
        assert_eq!(Value::Boolean(true).to_env_string(), "TRUE");
        assert_eq!(Value::Boolean(false).to_env_string(), "FALSE");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(8080.0).as_f64(), Some(8080.0));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(true).as_str(), None);
    }

    #[test]
    fn test_untagged_serialization() {
        let json = serde_json::to_string(&vec![
            Value::from("a"),
            Value::Number(1.5),
            Value::Boolean(false),
        ])
        .unwrap();
        assert_eq!(json, r#"["a",1.5,false]"#);
    }
}
