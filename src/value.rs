//! Dynamic value trees stored in node records and carried by payloads.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::model::PathStep;

/// A payload or node value: scalars, arrays, and string-keyed mappings.
///
/// Subtrees are shared through [`Arc`]; pointer identity of a subtree encodes
/// "unchanged since the snapshot that produced it". Serialization follows the
/// plain JSON shape so the canonical form stays unambiguous across ids and
/// debugging output.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Explicit null literal, distinct from an absent position.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// `None` entries are holes: positions that read as absent without
    /// shortening the array.
    Array(Vec<Option<Arc<Value>>>),
    Map(BTreeMap<String, Arc<Value>>),
}

impl Value {
    /// Returns true for the scalar variants (everything but arrays and maps).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Map(_))
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Arc<Value>>> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Option<Arc<Value>>]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }
}

/// Resolves `path` inside a value tree, returning the shared subtree at that
/// position. Holes and absent keys resolve to `None`.
pub fn value_at<'a>(root: Option<&'a Arc<Value>>, path: &[PathStep]) -> Option<&'a Arc<Value>> {
    let mut value = root?;
    for step in path {
        value = match (value.as_ref(), step) {
            (Value::Map(fields), PathStep::Field(name)) => fields.get(name.as_str())?,
            (Value::Array(items), PathStep::Index(index)) => items.get(*index)?.as_ref()?,
            _ => return None,
        };
    }
    Some(value)
}

impl From<serde_json::Value> for Value {
    fn from(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(flag),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(int) => Value::Int(int),
                None => Value::Float(number.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(text) => Value::String(text),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| Some(Arc::new(Value::from(item))))
                    .collect(),
            ),
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(key, item)| (key, Arc::new(Value::from(item))))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}
