//! Field declarations and their validation contract.
//!
//! A [`Field`] turns a candidate [`Value`] into a normalized value or a
//! [`FieldError`]. Scalar fields (`AnyField`, `IntField`, `FloatField`,
//! `BoolField`, `StringField`) coerce and check leaf values; composite fields
//! (`ListField`, `ObjectField`, `AnyOfField`, `AllOfField`) recurse into other
//! fields or record types through [`Shape`].
//!
//! # Example
//!
//! ```rust
//! use fieldwork::{Field, Schema, Value};
//!
//! let ids = Schema::list(Schema::int());
//! let value = ids.validate("ids", Value::from(serde_json::json!([1, 2, 3]))).unwrap();
//! assert_eq!(value, Value::from(serde_json::json!([1, 2, 3])));
//! ```

mod combinators;
mod list;
mod object;
mod scalar;
mod string;

use std::fmt;
use std::sync::Arc;

use crate::error::{ErrorKind, FieldError};
use crate::path::FieldPath;
use crate::record::{RecordRef, RecordType, ToDictOptions};
use crate::registry::{RegistryError, SchemaRegistry};
use crate::value::Value;

pub use combinators::{AllOfField, AnyOfField};
pub use list::ListField;
pub use object::ObjectField;
pub use scalar::{AnyField, BoolField, FloatField, IntField};
pub use string::StringField;

/// Metadata shared by every field variant.
#[derive(Debug, Clone, Default)]
pub struct FieldMeta {
    /// External name; when set it replaces the member name as canonical key.
    pub name: Option<String>,
    pub description: Option<String>,
    /// Returned, unvalidated, when the value is absent and not required.
    pub default: Option<Value>,
    /// Type-level value used in place of an undeclared default.
    pub fallback: Value,
    pub required: bool,
    /// Closed set of accepted values; empty means unconstrained.
    pub enums: Vec<Value>,
}

impl FieldMeta {
    pub(crate) fn with_fallback(fallback: Value) -> Self {
        Self {
            fallback,
            ..Self::default()
        }
    }

    /// The value an absent field takes: the declared default, else the
    /// type-level fallback.
    pub fn absent_value(&self) -> Value {
        self.default.clone().unwrap_or_else(|| self.fallback.clone())
    }

    fn check_enum(&self, value: &Value, path: &FieldPath) -> Result<(), FieldError> {
        if self.enums.is_empty() || self.enums.iter().any(|e| e.loosely_eq(value)) {
            return Ok(());
        }
        let allowed = Value::List(self.enums.clone()).to_string();
        Err(FieldError::new(
            path.clone(),
            ErrorKind::EnumViolation {
                allowed,
                got: value.to_string(),
            },
        ))
    }

    /// Adds `description`, `default` and `enum` to a schema fragment.
    ///
    /// Only a declared default is documented, never the fallback.
    pub(crate) fn annotate(&self, fragment: &mut serde_json::Map<String, serde_json::Value>) {
        if let Some(description) = &self.description {
            fragment.insert("description".into(), description.clone().into());
        }
        if let Some(default) = self.default.as_ref().filter(|d| !d.is_null()) {
            fragment.insert("default".into(), default.to_json());
        }
        if !self.enums.is_empty() {
            fragment.insert(
                "enum".into(),
                serde_json::Value::Array(self.enums.iter().map(Value::to_json).collect()),
            );
        }
    }
}

/// Builder methods for the metadata every field carries.
macro_rules! meta_builders {
    () => {
        /// Sets the external name used as this field's canonical key.
        pub fn alias(mut self, name: impl Into<String>) -> Self {
            self.meta.name = Some(name.into());
            self
        }

        pub fn description(mut self, text: impl Into<String>) -> Self {
            self.meta.description = Some(text.into());
            self
        }

        /// Value used when the field is absent and not required.
        pub fn default_value(mut self, value: impl Into<$crate::Value>) -> Self {
            self.meta.default = Some(value.into());
            self
        }

        pub fn required(mut self) -> Self {
            self.meta.required = true;
            self
        }

        /// Restricts accepted values to `values`.
        pub fn enums<I, V>(mut self, values: I) -> Self
        where
            I: IntoIterator<Item = V>,
            V: Into<$crate::Value>,
        {
            self.meta.enums = values.into_iter().map(Into::into).collect();
            self
        }
    };
}

pub(crate) use meta_builders;

/// The validation contract shared by every field variant.
///
/// Implementors provide [`coerce`](Field::coerce) for present values; the
/// provided [`validate_at`](Field::validate_at) handles absence, defaults and
/// enumeration membership uniformly.
pub trait Field: fmt::Debug + Send + Sync {
    fn meta(&self) -> &FieldMeta;

    /// Short label naming what this field accepts, used in diagnostics.
    fn label(&self) -> String;

    /// Coerces and checks a present (non-null) value.
    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError>;

    /// Emits this field's schema fragment, registering nested record types.
    fn introspect(&self, registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError>;

    /// The record type this field wraps, for fields that wrap exactly one.
    fn record_target(&self) -> Option<Arc<RecordType>> {
        None
    }

    /// Validates `value` located at `path`.
    fn validate_at(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        let meta = self.meta();
        if value.is_null() {
            if meta.required {
                return Err(FieldError::missing(path.clone()));
            }
            return Ok(meta.absent_value());
        }
        let value = self.coerce(value, path)?;
        meta.check_enum(&value, path)?;
        Ok(value)
    }

    /// Validates `value` for the field called `name`.
    fn validate(&self, name: &str, value: Value) -> Result<Value, FieldError> {
        self.validate_at(value, &FieldPath::from_field(name))
    }
}

/// What a composite field recurses into: a field or a record type.
#[derive(Debug, Clone)]
pub enum Shape {
    Field(Arc<dyn Field>),
    Record(RecordRef),
}

impl Shape {
    pub fn field<F: Field + 'static>(field: F) -> Self {
        Shape::Field(Arc::new(field))
    }

    /// A default-constructed field of type `F`.
    pub fn default_of<F: Field + Default + 'static>() -> Self {
        Shape::Field(Arc::new(F::default()))
    }

    pub fn record(record_type: impl Into<RecordRef>) -> Self {
        Shape::Record(record_type.into())
    }

    pub fn label(&self) -> String {
        match self {
            Shape::Field(field) => field.label(),
            Shape::Record(target) => target.name(),
        }
    }

    /// The record type behind this shape, if it is or wraps exactly one.
    pub(crate) fn record_target(&self) -> Option<Arc<RecordType>> {
        match self {
            Shape::Field(field) => field.record_target(),
            Shape::Record(target) => target.get(),
        }
    }

    /// Validates `value`; record results are flattened when `to_dict` is set.
    pub(crate) fn validate_at(
        &self,
        value: Value,
        path: &FieldPath,
        to_dict: bool,
    ) -> Result<Value, FieldError> {
        let validated = match self {
            Shape::Field(field) => field.validate_at(value, path)?,
            Shape::Record(target) => {
                let record_type = target.resolve(path)?;
                Value::Record(record_type.coerce(value, path)?)
            }
        };
        Ok(match validated {
            Value::Record(record) if to_dict => Value::Map(record.to_dict(&ToDictOptions::default())),
            other => other,
        })
    }

    pub fn introspect(&self, registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        match self {
            Shape::Field(field) => field.introspect(registry),
            Shape::Record(target) => registry.reference(target),
        }
    }
}

impl<F: Field + 'static> From<F> for Shape {
    fn from(field: F) -> Self {
        Shape::field(field)
    }
}

impl From<Arc<RecordType>> for Shape {
    fn from(record_type: Arc<RecordType>) -> Self {
        Shape::Record(RecordRef::from(record_type))
    }
}

impl From<&Arc<RecordType>> for Shape {
    fn from(record_type: &Arc<RecordType>) -> Self {
        Shape::Record(RecordRef::from(record_type))
    }
}

impl From<RecordRef> for Shape {
    fn from(target: RecordRef) -> Self {
        Shape::Record(target)
    }
}

/// Turns JSON text into a structured value for fields that accept
/// pre-serialized input; other values pass through.
pub(crate) fn decode_text(value: Value, path: &FieldPath, expected: &str) -> Result<Value, FieldError> {
    match value {
        Value::String(text) => Value::decode_text(&text).ok_or_else(|| {
            FieldError::type_mismatch(path.clone(), expected, &Value::String(text))
        }),
        other => Ok(other),
    }
}

/// Entry point for declaring fields.
///
/// ```rust
/// use fieldwork::Schema;
///
/// let port = Schema::int().min_value(2).max_value(65535).default_value(80);
/// let host = Schema::string().min_length(2).max_length(255);
/// let tags = Schema::list(Schema::string()).max_items(8);
/// ```
pub struct Schema;

impl Schema {
    pub fn any() -> AnyField {
        AnyField::new()
    }

    pub fn int() -> IntField {
        IntField::new()
    }

    pub fn float() -> FloatField {
        FloatField::new()
    }

    pub fn bool() -> BoolField {
        BoolField::new()
    }

    pub fn string() -> StringField {
        StringField::new()
    }

    pub fn list(item: impl Into<Shape>) -> ListField {
        ListField::new(item)
    }

    pub fn object(target: impl Into<RecordRef>) -> ObjectField {
        ObjectField::new(target)
    }

    pub fn any_of<I, S>(alternatives: I) -> AnyOfField
    where
        I: IntoIterator<Item = S>,
        S: Into<Shape>,
    {
        AnyOfField::new(alternatives)
    }

    pub fn all_of<I, S>(alternatives: I) -> AllOfField
    where
        I: IntoIterator<Item = S>,
        S: Into<Shape>,
    {
        AllOfField::new(alternatives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_required_is_missing() {
        let field = IntField::new().required();
        let error = field.validate("age", Value::Null).unwrap_err();
        assert_eq!(error.kind, ErrorKind::MissingRequiredField);
        assert_eq!(error.path.to_string(), "age");
    }

    #[test]
    fn test_absent_optional_returns_default_unvalidated() {
        // the default violates the bounds; it is returned as-is
        let field = IntField::new().min_value(10).default_value(0);
        assert_eq!(field.validate("age", Value::Null).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_absent_without_default_uses_type_fallback() {
        assert_eq!(IntField::new().validate("n", Value::Null).unwrap(), Value::Int(0));
        assert_eq!(FloatField::new().validate("n", Value::Null).unwrap(), Value::Float(0.0));
        assert_eq!(BoolField::new().validate("b", Value::Null).unwrap(), Value::Bool(false));
        assert_eq!(StringField::new().validate("s", Value::Null).unwrap(), Value::from(""));
        assert_eq!(
            ListField::new(IntField::new()).validate("ids", Value::Null).unwrap(),
            Value::List(vec![])
        );
        assert_eq!(AnyField::new().validate("any", Value::Null).unwrap(), Value::Null);
        assert_eq!(
            StringField::new().default_value("x").validate("s", Value::Null).unwrap(),
            Value::from("x")
        );
    }

    #[test]
    fn test_fallback_is_not_documented() {
        let registry = SchemaRegistry::new();
        assert_eq!(
            IntField::new().introspect(&registry).unwrap(),
            json!({"type": "integer"})
        );
        assert_eq!(
            IntField::new().default_value(0).introspect(&registry).unwrap(),
            json!({"type": "integer", "default": 0})
        );
    }

    #[test]
    fn test_enum_membership() {
        let field = StringField::new().enums(["http", "https"]);
        assert!(field.validate("protocol", "https".into()).is_ok());

        let error = field.validate("protocol", "ftp".into()).unwrap_err();
        assert_eq!(error.code(), "enum");
        assert!(error.to_string().contains(r#"["http","https"]"#));
    }

    #[test]
    fn test_float_enum_accepts_integer_literals() {
        let field = FloatField::new().enums([1, 2]);
        assert_eq!(field.validate("ratio", Value::Int(2)).unwrap(), Value::Float(2.0));
        assert!(field.validate("ratio", Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_default_of_constructs_field() {
        let shape = Shape::default_of::<IntField>();
        assert_eq!(shape.label(), "integer");
        let value = shape
            .validate_at(Value::from(json!("7")), &FieldPath::from_field("n"), false)
            .unwrap();
        assert_eq!(value, Value::Int(7));
    }

    #[test]
    fn test_decode_text_passes_structured_values() {
        let path = FieldPath::from_field("ids");
        let list = Value::List(vec![Value::Int(1)]);
        assert_eq!(decode_text(list.clone(), &path, "array").unwrap(), list);
        assert_eq!(decode_text("[1]".into(), &path, "array").unwrap(), list);
        assert_eq!(decode_text("nope".into(), &path, "array").unwrap_err().code(), "invalid_type");
    }
}
