//! Body values accepted by the dispatcher.
//!
//! # Design
//! Request bodies are maps of field name to [`BodyValue`] instead of an
//! opaque JSON value, so unsupported shapes are rejected up front with a
//! `Validation` error rather than somewhere inside an encoder. The enum is
//! `untagged`, so it serializes as the plain JSON scalar or object it holds.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// A single body field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Map(BTreeMap<String, BodyValue>),
}

impl BodyValue {
    /// Reject values no encoder can represent faithfully.
    pub(crate) fn validate(&self, key: &str) -> Result<(), DispatchError> {
        match self {
            BodyValue::Float(f) if !f.is_finite() => Err(DispatchError::Validation(format!(
                "field `{key}` holds a non-finite number"
            ))),
            BodyValue::Map(inner) => inner
                .iter()
                .try_for_each(|(k, v)| v.validate(&format!("{key}.{k}"))),
            _ => Ok(()),
        }
    }

    /// Render a scalar for form encoding. Nested maps have no form
    /// representation.
    pub(crate) fn to_form_value(&self, key: &str) -> Result<String, DispatchError> {
        match self {
            BodyValue::Map(_) => Err(DispatchError::Validation(format!(
                "field `{key}` is a nested map, which form bodies cannot carry"
            ))),
            scalar => Ok(scalar.to_string()),
        }
    }
}

impl fmt::Display for BodyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyValue::Bool(b) => write!(f, "{b}"),
            BodyValue::Integer(i) => write!(f, "{i}"),
            BodyValue::Float(x) => write!(f, "{x}"),
            BodyValue::Text(s) => f.write_str(s),
            BodyValue::Map(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<&str> for BodyValue {
    fn from(s: &str) -> Self {
        BodyValue::Text(s.to_string())
    }
}

impl From<String> for BodyValue {
    fn from(s: String) -> Self {
        BodyValue::Text(s)
    }
}

impl From<i64> for BodyValue {
    fn from(i: i64) -> Self {
        BodyValue::Integer(i)
    }
}

impl From<i32> for BodyValue {
    fn from(i: i32) -> Self {
        BodyValue::Integer(i64::from(i))
    }
}

impl From<f64> for BodyValue {
    fn from(x: f64) -> Self {
        BodyValue::Float(x)
    }
}

impl From<bool> for BodyValue {
    fn from(b: bool) -> Self {
        BodyValue::Bool(b)
    }
}

impl From<BTreeMap<String, BodyValue>> for BodyValue {
    fn from(map: BTreeMap<String, BodyValue>) -> Self {
        BodyValue::Map(map)
    }
}
