//! Key/value leaf of the template language.

use std::fmt;

use crate::error::{Result, TemplateError};

/// A value accepted by the template builders.
///
/// The control plane only knows strings; integers are rendered in decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairValue {
    Int(i64),
    Uint(u64),
    Str(String),
}

impl PairValue {
    /// Render the value as it appears on the wire.
    pub fn into_string(self) -> String {
        match self {
            PairValue::Int(v) => v.to_string(),
            PairValue::Uint(v) => v.to_string(),
            PairValue::Str(s) => s,
        }
    }
}

macro_rules! pair_value_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for PairValue {
                fn from(v: $t) -> Self {
                    PairValue::$variant(v as $target)
                }
            }
        )*
    };
}

pair_value_from!(Int as i64: i8, i16, i32, i64, isize);
pair_value_from!(Uint as u64: u8, u16, u32, u64, usize);

impl From<&str> for PairValue {
    fn from(v: &str) -> Self {
        PairValue::Str(v.to_string())
    }
}

impl From<String> for PairValue {
    fn from(v: String) -> Self {
        PairValue::Str(v)
    }
}

impl From<&String> for PairValue {
    fn from(v: &String) -> Self {
        PairValue::Str(v.clone())
    }
}

/// Values coming from untyped input (JSON payloads, config files).
///
/// Only integers and strings are representable; anything else is rejected
/// with [`TemplateError::TypeMismatch`].
impl TryFrom<&serde_json::Value> for PairValue {
    type Error = TemplateError;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::String(s) => Ok(PairValue::Str(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(PairValue::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(PairValue::Uint(u))
                } else {
                    Err(TemplateError::TypeMismatch(format!(
                        "unexpected type: float {}",
                        n
                    )))
                }
            }
            Value::Bool(_) => Err(TemplateError::TypeMismatch(
                "unexpected type: boolean".to_string(),
            )),
            Value::Null => Err(TemplateError::TypeMismatch(
                "unexpected type: null".to_string(),
            )),
            Value::Array(_) => Err(TemplateError::TypeMismatch(
                "unexpected type: array".to_string(),
            )),
            Value::Object(_) => Err(TemplateError::TypeMismatch(
                "unexpected type: object".to_string(),
            )),
        }
    }
}

/// A `KEY="value"` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePair {
    key: String,
    value: String,
}

impl TemplatePair {
    /// Create a pair on the build path: the key is upper-cased.
    pub fn new(key: &str, value: impl Into<PairValue>) -> Self {
        Self {
            key: key.to_uppercase(),
            value: value.into().into_string(),
        }
    }

    /// Create a pair from parsed input, keeping the key verbatim.
    pub fn parsed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value, keeping the key.
    pub fn set_value(&mut self, value: impl Into<PairValue>) -> &mut Self {
        self.value = value.into().into_string();
        self
    }

    /// Interpret the value as a signed integer.
    pub fn as_int(&self) -> Result<i64> {
        self.value.trim().parse::<i64>().map_err(|e| {
            TemplateError::TypeMismatch(format!(
                "value {:?} of {} is not an integer: {}",
                self.value, self.key, e
            ))
        })
    }

    /// Interpret the value as a non-negative integer (IDs).
    pub fn as_id(&self) -> Result<u64> {
        self.value.trim().parse::<u64>().map_err(|e| {
            TemplateError::TypeMismatch(format!(
                "value {:?} of {} is not an ID: {}",
                self.value, self.key, e
            ))
        })
    }

    /// Interpret the value as a float.
    pub fn as_float(&self) -> Result<f64> {
        self.value.trim().parse::<f64>().map_err(|e| {
            TemplateError::TypeMismatch(format!(
                "value {:?} of {} is not a number: {}",
                self.value, self.key, e
            ))
        })
    }
}

/// Wire form. The value is only surrounded by quotes, never escaped.
impl fmt::Display for TemplatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_path_uppercases_key() {
        let pair = TemplatePair::new("memory", 512u32);
        assert_eq!(pair.key(), "MEMORY");
        assert_eq!(pair.to_string(), r#"MEMORY="512""#);
    }

    #[test]
    fn test_parsed_pair_keeps_key_and_empty_value() {
        let pair = TemplatePair::parsed("Name", "");
        assert_eq!(pair.key(), "Name");
        assert_eq!(pair.to_string(), r#"Name="""#);
    }

    #[test]
    fn test_set_value_keeps_key() {
        let mut pair = TemplatePair::parsed("Memory", "512");
        pair.set_value(1024u32);
        assert_eq!(pair.key(), "Memory");
        assert_eq!(pair.as_int().unwrap(), 1024);

        pair.set_value("-");
        assert_eq!(pair.to_string(), "Memory=\"-\"");
    }

    #[test]
    fn test_no_quote_escaping() {
        let pair = TemplatePair::new("CMD", r#"echo "hi""#);
        assert_eq!(pair.to_string(), r#"CMD="echo "hi"""#);
    }

    #[test]
    fn test_signed_values() {
        let pair = TemplatePair::new("OFFSET", -4i32);
        assert_eq!(pair.value(), "-4");
        assert_eq!(pair.as_int().unwrap(), -4);
        assert!(matches!(pair.as_id(), Err(TemplateError::TypeMismatch(_))));
    }

    #[test]
    fn test_json_values() {
        assert_eq!(
            PairValue::try_from(&json!("vnc")).unwrap(),
            PairValue::Str("vnc".into())
        );
        assert_eq!(PairValue::try_from(&json!(3)).unwrap(), PairValue::Int(3));
        assert_eq!(
            PairValue::try_from(&json!(u64::MAX)).unwrap(),
            PairValue::Uint(u64::MAX)
        );

        for bad in [json!(1.5), json!(true), json!(null), json!([1]), json!({"a": 1})] {
            assert!(matches!(
                PairValue::try_from(&bad),
                Err(TemplateError::TypeMismatch(_))
            ));
        }
    }
}
