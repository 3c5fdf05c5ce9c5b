//! Object field: a slot holding an instance of one record type.

use std::sync::Arc;

use crate::error::FieldError;
use crate::path::FieldPath;
use crate::record::{RecordRef, RecordType, ToDictOptions};
use crate::registry::{RegistryError, SchemaRegistry};
use crate::value::{Map, Value};

use super::{decode_text, meta_builders, Field, FieldMeta};

/// A field whose value is an instance of a target record type.
///
/// An instance of the target is returned as-is; a mapping (or JSON text
/// encoding one) is used to construct a new instance.
///
/// # Example
///
/// ```rust
/// use fieldwork::{Field, ObjectField, RecordType, StringField, Value};
///
/// let bar = RecordType::builder("Bar")
///     .field("bar", StringField::new().default_value("bar"))
///     .build();
/// let field = ObjectField::new(&bar);
///
/// let value = field.validate("bars", Value::from(serde_json::json!({"bar": "x"}))).unwrap();
/// assert_eq!(value.as_record().unwrap().name(), "Bar");
/// ```
#[derive(Debug, Clone)]
pub struct ObjectField {
    meta: FieldMeta,
    target: RecordRef,
    to_dict: bool,
}

impl ObjectField {
    pub fn new(target: impl Into<RecordRef>) -> Self {
        Self {
            meta: FieldMeta::with_fallback(Value::Map(Map::new())),
            target: target.into(),
            to_dict: false,
        }
    }

    meta_builders!();

    /// Emits the plain mapping form instead of the record instance.
    pub fn to_dict(mut self, enabled: bool) -> Self {
        self.to_dict = enabled;
        self
    }

    pub fn target(&self) -> &RecordRef {
        &self.target
    }
}

impl Field for ObjectField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        self.target.name()
    }

    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        let record_type = self.target.resolve(path)?;
        let value = decode_text(value, path, record_type.name())?;
        let record = record_type.coerce(value, path)?;
        Ok(if self.to_dict {
            Value::Map(record.to_dict(&ToDictOptions::default()))
        } else {
            Value::Record(record)
        })
    }

    fn introspect(&self, registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        registry.reference(&self.target)
    }

    fn record_target(&self) -> Option<Arc<RecordType>> {
        self.target.get()
    }
}
