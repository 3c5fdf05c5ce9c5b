//! The in-memory value model fields validate and records store.
//!
//! [`Value`] mirrors the JSON data model with two differences: integers and
//! floats are kept apart, and a slot may hold a live [`Record`] instance.
//! Conversions to and from `serde_json::Value` are provided for callers that
//! already decoded their input with serde.

use std::fmt::{self, Display};

use indexmap::IndexMap;

use crate::record::{Record, ToDictOptions};

/// An ordered mapping from key to value.
pub type Map = IndexMap<String, Value>;

/// A decoded value as seen by fields and records.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent. Fields treat `Null` the same as a missing key.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
    Record(Record),
}

impl Value {
    /// Returns the category name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "array",
            Value::Map(_) => "object",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Decodes JSON text into a value, or `None` if the text is not JSON.
    pub fn decode_text(text: &str) -> Option<Value> {
        serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .map(Value::from)
    }

    /// Equality that treats `Int(n)` and `Float(n.0)` as the same number.
    ///
    /// Enumerations are declared with literal values, so `enums([1, 2])` on a
    /// float field must still admit the normalized `2.0`.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            _ => self == other,
        }
    }

    /// Converts to JSON, flattening any records with default projection.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Record(record) => record.to_json(&ToDictOptions::default()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 above i64::MAX and true floats both land here
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.to_json()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_numbers_keep_integer_and_float_apart() {
        assert_eq!(Value::from(json!(11)), Value::Int(11));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from(json!(u64::MAX)), Value::Float(u64::MAX as f64));
    }

    #[test]
    fn test_json_objects_convert_recursively() {
        let value = Value::from(json!({"server": {"ports": [80, 443]}}));
        let server = value.as_map().unwrap()["server"].as_map().unwrap();
        assert_eq!(
            server["ports"],
            Value::List(vec![Value::Int(80), Value::Int(443)])
        );
    }

    #[test]
    fn test_to_json_round_trip() {
        let original = json!({"ids": [1, 2, 3], "name": "demo", "ratio": 0.5, "on": true});
        assert_eq!(Value::from(original.clone()).to_json(), original);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(
            Value::decode_text("[1, 2]"),
            Some(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(Value::decode_text("not json"), None);
    }

    #[test]
    fn test_loosely_eq_bridges_int_and_float() {
        assert!(Value::Int(2).loosely_eq(&Value::Float(2.0)));
        assert!(Value::Float(2.0).loosely_eq(&Value::Int(2)));
        assert!(!Value::Int(2).loosely_eq(&Value::Float(2.5)));
        assert!(!Value::Int(2).loosely_eq(&Value::String("2".into())));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::List(vec![]).type_name(), "array");
        assert_eq!(Value::Map(Map::new()).type_name(), "object");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }
}
