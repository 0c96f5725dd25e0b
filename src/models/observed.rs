//! Observed configuration
//!
//! The operator publishes the configuration it actually applied as an
//! opaque JSON object. Lookups follow nested field paths and distinguish a
//! missing field (`Ok(None)`) from a field of the wrong type (`Err`).

use serde_json::{Map, Value};
use thiserror::Error;

pub const SERVING_INFO: &str = "servingInfo";
pub const MIN_TLS_VERSION: &str = "minTLSVersion";
pub const CIPHER_SUITES: &str = "cipherSuites";

/// Observed config field lookup errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("observed config is not a JSON object (got {0})")]
    NotAnObject(&'static str),

    #[error("{path} accessor error: expected {expected}, got {actual}")]
    WrongType {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Snapshot of the configuration applied by the operator
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObservedConfig {
    root: Map<String, Value>,
}

impl ObservedConfig {
    /// Wrap an observed config value; absent or null means empty
    pub fn from_value(value: Option<&Value>) -> Result<Self, FieldError> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self { root: map.clone() }),
            Some(other) => Err(FieldError::NotAnObject(kind(other))),
        }
    }

    /// Value at `path`, if every intermediate field is an object
    pub fn nested(&self, path: &[&str]) -> Result<Option<&Value>, FieldError> {
        let Some((last, parents)) = path.split_last() else {
            return Ok(None);
        };

        let mut current = &self.root;
        for (i, field) in parents.iter().enumerate() {
            match current.get(*field) {
                None => return Ok(None),
                Some(Value::Object(map)) => current = map,
                Some(other) => {
                    return Err(FieldError::WrongType {
                        path: path[..=i].join("."),
                        expected: "object",
                        actual: kind(other),
                    })
                }
            }
        }

        Ok(current.get(*last))
    }

    pub fn nested_string(&self, path: &[&str]) -> Result<Option<&str>, FieldError> {
        match self.nested(path)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(FieldError::WrongType {
                path: path.join("."),
                expected: "string",
                actual: kind(other),
            }),
        }
    }

    pub fn nested_string_slice(&self, path: &[&str]) -> Result<Option<Vec<String>>, FieldError> {
        let items = match self.nested(path)? {
            None => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(FieldError::WrongType {
                    path: path.join("."),
                    expected: "array",
                    actual: kind(other),
                })
            }
        };

        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(FieldError::WrongType {
                    path: path.join("."),
                    expected: "string element",
                    actual: kind(other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// The serving section, if present
    pub fn serving_info(&self) -> Result<Option<ServingInfo>, FieldError> {
        match self.nested(&[SERVING_INFO])? {
            None => return Ok(None),
            Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(FieldError::WrongType {
                    path: SERVING_INFO.to_string(),
                    expected: "object",
                    actual: kind(other),
                })
            }
        }

        Ok(Some(ServingInfo {
            min_tls_version: self
                .nested_string(&[SERVING_INFO, MIN_TLS_VERSION])?
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            cipher_suites: self
                .nested_string_slice(&[SERVING_INFO, CIPHER_SUITES])?
                .unwrap_or_default(),
        }))
    }
}

/// TLS settings of the serving section
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServingInfo {
    pub min_tls_version: Option<String>,
    pub cipher_suites: Vec<String>,
}

impl ServingInfo {
    /// Required ciphers not present in the observed list
    pub fn missing_ciphers<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|c| !self.cipher_suites.iter().any(|have| have == c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observed(value: Value) -> ObservedConfig {
        ObservedConfig::from_value(Some(&value)).unwrap()
    }

    #[test]
    fn test_missing_config_is_empty() {
        let missing = ObservedConfig::from_value(None).unwrap();
        assert_eq!(missing, ObservedConfig::default());
        assert_eq!(missing.serving_info(), Ok(None));
        let null = ObservedConfig::from_value(Some(&Value::Null)).unwrap();
        assert_eq!(null, ObservedConfig::default());
        assert_eq!(
            ObservedConfig::from_value(Some(&json!([1]))),
            Err(FieldError::NotAnObject("array"))
        );
    }

    #[test]
    fn test_nested_lookups() {
        let cfg = observed(json!({
            "servingInfo": {"minTLSVersion": "VersionTLS13", "cipherSuites": ["A", "B"]},
            "build": {"imageTemplateFormat": {"format": "x"}}
        }));

        assert_eq!(
            cfg.nested_string(&["servingInfo", "minTLSVersion"]).unwrap(),
            Some("VersionTLS13")
        );
        assert_eq!(
            cfg.nested_string_slice(&["servingInfo", "cipherSuites"]).unwrap(),
            Some(vec!["A".to_string(), "B".to_string()])
        );
        assert_eq!(cfg.nested_string(&["servingInfo", "absent"]).unwrap(), None);
        assert_eq!(cfg.nested_string(&["absent", "deeper"]).unwrap(), None);
    }

    #[test]
    fn test_wrong_types_are_errors() {
        let cfg = observed(json!({"servingInfo": {"minTLSVersion": 13, "cipherSuites": [1]}}));

        assert!(matches!(
            cfg.nested_string(&["servingInfo", "minTLSVersion"]),
            Err(FieldError::WrongType { expected: "string", .. })
        ));
        assert!(cfg.nested_string_slice(&["servingInfo", "cipherSuites"]).is_err());

        let cfg = observed(json!({"servingInfo": "flat"}));
        assert!(cfg.serving_info().is_err());
        assert!(cfg.nested_string(&["servingInfo", "minTLSVersion"]).is_err());
    }

    #[test]
    fn test_serving_info() {
        let cfg = observed(json!({"servingInfo": {"minTLSVersion": "", "cipherSuites": ["A"]}}));
        let info = cfg.serving_info().unwrap().unwrap();
        assert_eq!(info.min_tls_version, None);
        assert_eq!(info.missing_ciphers(&["A", "B"]), vec!["B"]);

        assert_eq!(observed(json!({})).serving_info().unwrap(), None);
    }
}
