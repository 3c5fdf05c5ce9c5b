//! Flattening record instances back to plain mappings.

use std::collections::HashSet;

use super::{is_internal, Record};
use crate::field::Field;
use crate::value::{Map, Value};

/// Options for [`Record::to_dict`].
///
/// With a non-empty `only`, keys in `only` but not in `remove` are kept.
/// Otherwise every key not in `remove` is kept. Internal keys (leading `_`)
/// are never emitted. The same options apply to every nested record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToDictOptions {
    pub fill_defaults: bool,
    pub only: HashSet<String>,
    pub remove: HashSet<String>,
}

impl ToDictOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits absent fields with their default, or their type-level fallback.
    pub fn fill_defaults(mut self, enabled: bool) -> Self {
        self.fill_defaults = enabled;
        self
    }

    pub fn only<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn remove<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove.extend(keys.into_iter().map(Into::into));
        self
    }

    fn admits(&self, key: &str) -> bool {
        if is_internal(key) || self.remove.contains(key) {
            return false;
        }
        self.only.is_empty() || self.only.contains(key)
    }

    fn flatten(&self, value: &Value) -> Value {
        match value {
            Value::Record(record) => Value::Map(record.to_dict(self)),
            Value::List(items) => Value::List(items.iter().map(|item| self.flatten(item)).collect()),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), self.flatten(value)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl Record {
    /// Returns the stored fields as a plain ordered mapping.
    ///
    /// Keys follow declaration order. Nested records, including records
    /// inside lists, are flattened with the same options. Without
    /// `fill_defaults` only stored keys are emitted.
    pub fn to_dict(&self, options: &ToDictOptions) -> Map {
        let mut out = Map::new();
        for (key, field) in self.record_type.fields() {
            if !options.admits(key) {
                continue;
            }
            let default = || field.meta().absent_value();
            let value = match self.values.get(key) {
                Some(Value::Null) if options.fill_defaults => default(),
                Some(value) => options.flatten(value),
                None if options.fill_defaults => default(),
                None => continue,
            };
            out.insert(key.to_string(), value);
        }
        out
    }

    /// [`to_dict`](Record::to_dict) rendered as a JSON object.
    pub fn to_json(&self, options: &ToDictOptions) -> serde_json::Value {
        Value::Map(self.to_dict(options)).to_json()
    }
}
