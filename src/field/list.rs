//! List field validation.

use serde_json::json;

use crate::error::{Bound, ErrorKind, FieldError};
use crate::path::FieldPath;
use crate::registry::{RegistryError, SchemaRegistry};
use crate::value::Value;

use super::{decode_text, meta_builders, Field, FieldMeta, Shape};

/// A field for lists whose every item is validated against one [`Shape`].
///
/// JSON text is decoded before validation, so `"[1, 2]"` is accepted where
/// a list is expected. Items that are record types are constructed from
/// mappings, and flattened back to mappings when
/// [`to_dict`](ListField::to_dict) is set.
///
/// # Example
///
/// ```rust
/// use fieldwork::{Field, IntField, ListField, Value};
///
/// let ids = ListField::new(IntField::new()).max_items(3);
/// assert_eq!(
///     ids.validate("ids", Value::from("[1, 2, 3]")).unwrap(),
///     Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
/// );
///
/// let error = ids.validate("ids", Value::List(vec![Value::from("x")])).unwrap_err();
/// assert_eq!(error.path.to_string(), "ids[0]");
/// ```
#[derive(Debug, Clone)]
pub struct ListField {
    meta: FieldMeta,
    item: Shape,
    min_items: Option<usize>,
    max_items: Option<usize>,
    to_dict: bool,
}

impl ListField {
    pub fn new(item: impl Into<Shape>) -> Self {
        Self {
            meta: FieldMeta::with_fallback(Value::List(Vec::new())),
            item: item.into(),
            min_items: None,
            max_items: None,
            to_dict: false,
        }
    }

    meta_builders!();

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Emits record items as plain mappings instead of record instances.
    pub fn to_dict(mut self, enabled: bool) -> Self {
        self.to_dict = enabled;
        self
    }

    pub fn item(&self) -> &Shape {
        &self.item
    }
}

impl Field for ListField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        format!("array of {}", self.item.label())
    }

    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        let items = match decode_text(value, path, "array")? {
            Value::List(items) => items,
            other => return Err(FieldError::type_mismatch(path.clone(), "array", &other)),
        };

        let len = items.len();
        let bound = match (self.min_items, self.max_items) {
            (Some(min), _) if len < min => Some(Bound::at_least(min)),
            (_, Some(max)) if len > max => Some(Bound::at_most(max)),
            _ => None,
        };
        if let Some(bound) = bound {
            return Err(FieldError::new(
                path.clone(),
                ErrorKind::LengthViolation {
                    bound,
                    got: len,
                    unit: "items",
                },
            ));
        }

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.item.validate_at(item, &path.push_index(index), self.to_dict))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn introspect(&self, registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        let mut fragment = serde_json::Map::new();
        fragment.insert("type".into(), json!("array"));
        fragment.insert("items".into(), self.item.introspect(registry)?);
        if let Some(min) = self.min_items {
            fragment.insert("minItems".into(), json!(min));
        }
        if let Some(max) = self.max_items {
            fragment.insert("maxItems".into(), json!(max));
        }
        self.meta.annotate(&mut fragment);
        Ok(serde_json::Value::Object(fragment))
    }
}
