//! Leaf fields for untyped, numeric and boolean values.
//!
//! Numeric fields attempt a parse of their input: `"11"` validates as the
//! integer `11`, and an integral float such as `11.0` as well. Bounds are
//! inclusive.

use serde_json::json;

use crate::error::{Bound, ErrorKind, FieldError};
use crate::path::FieldPath;
use crate::registry::{RegistryError, SchemaRegistry};
use crate::value::Value;

use super::{meta_builders, Field, FieldMeta};

/// Accepts any present value unchanged.
#[derive(Debug, Clone, Default)]
pub struct AnyField {
    meta: FieldMeta,
}

impl AnyField {
    pub fn new() -> Self {
        Self::default()
    }

    meta_builders!();
}

impl Field for AnyField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        "any".to_string()
    }

    fn coerce(&self, value: Value, _path: &FieldPath) -> Result<Value, FieldError> {
        Ok(value)
    }

    fn introspect(&self, _registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        let mut fragment = serde_json::Map::new();
        self.meta.annotate(&mut fragment);
        Ok(serde_json::Value::Object(fragment))
    }
}

/// A field for integer values.
///
/// # Example
///
/// ```rust
/// use fieldwork::{Field, IntField, Value};
///
/// let age = IntField::new().min_value(10).max_value(20).required();
/// assert_eq!(age.validate("age", Value::Int(11)).unwrap(), Value::Int(11));
/// assert_eq!(age.validate("age", Value::from("12")).unwrap(), Value::Int(12));
/// assert!(age.validate("age", Value::Null).is_err());
/// assert!(age.validate("age", Value::Int(25)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct IntField {
    meta: FieldMeta,
    min_value: Option<i64>,
    max_value: Option<i64>,
    format: Option<String>,
}

impl Default for IntField {
    fn default() -> Self {
        Self {
            meta: FieldMeta::with_fallback(Value::Int(0)),
            min_value: None,
            max_value: None,
            format: None,
        }
    }
}

impl IntField {
    pub fn new() -> Self {
        Self::default()
    }

    meta_builders!();

    pub fn min_value(mut self, min: i64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn max_value(mut self, max: i64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Documentation-only format tag, e.g. `int64`.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
            if *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                Some(*f as i64)
            } else {
                None
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

impl Field for IntField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        "integer".to_string()
    }

    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        let n = parse_int(&value)
            .ok_or_else(|| FieldError::type_mismatch(path.clone(), "integer", &value))?;
        check_range(n, self.min_value, self.max_value, path)?;
        Ok(Value::Int(n))
    }

    fn introspect(&self, _registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        let mut fragment = serde_json::Map::new();
        fragment.insert("type".into(), json!("integer"));
        if let Some(min) = self.min_value {
            fragment.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.max_value {
            fragment.insert("maximum".into(), json!(max));
        }
        if let Some(format) = &self.format {
            fragment.insert("format".into(), json!(format));
        }
        self.meta.annotate(&mut fragment);
        Ok(serde_json::Value::Object(fragment))
    }
}

/// A field for floating point values; integers are widened.
#[derive(Debug, Clone)]
pub struct FloatField {
    meta: FieldMeta,
    min_value: Option<f64>,
    max_value: Option<f64>,
    format: Option<String>,
}

impl Default for FloatField {
    fn default() -> Self {
        Self {
            meta: FieldMeta::with_fallback(Value::Float(0.0)),
            min_value: None,
            max_value: None,
            format: None,
        }
    }
}

impl FloatField {
    pub fn new() -> Self {
        Self::default()
    }

    meta_builders!();

    pub fn min_value(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) if f.is_finite() => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

impl Field for FloatField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        "number".to_string()
    }

    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        let f = parse_float(&value)
            .ok_or_else(|| FieldError::type_mismatch(path.clone(), "number", &value))?;
        check_range(f, self.min_value, self.max_value, path)?;
        Ok(Value::Float(f))
    }

    fn introspect(&self, _registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        let mut fragment = serde_json::Map::new();
        fragment.insert("type".into(), json!("number"));
        if let Some(min) = self.min_value {
            fragment.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.max_value {
            fragment.insert("maximum".into(), json!(max));
        }
        if let Some(format) = &self.format {
            fragment.insert("format".into(), json!(format));
        }
        self.meta.annotate(&mut fragment);
        Ok(serde_json::Value::Object(fragment))
    }
}

fn check_range<T>(value: T, min: Option<T>, max: Option<T>, path: &FieldPath) -> Result<(), FieldError>
where
    T: PartialOrd + ToString + Copy,
{
    if let Some(min) = min.filter(|m| value < *m) {
        return Err(FieldError::new(
            path.clone(),
            ErrorKind::RangeViolation {
                bound: Bound::at_least(min),
                got: value.to_string(),
            },
        ));
    }
    if let Some(max) = max.filter(|m| value > *m) {
        return Err(FieldError::new(
            path.clone(),
            ErrorKind::RangeViolation {
                bound: Bound::at_most(max),
                got: value.to_string(),
            },
        ));
    }
    Ok(())
}

/// A field for booleans; the text `"true"`/`"false"` is accepted in any case.
#[derive(Debug, Clone)]
pub struct BoolField {
    meta: FieldMeta,
}

impl Default for BoolField {
    fn default() -> Self {
        Self {
            meta: FieldMeta::with_fallback(Value::Bool(false)),
        }
    }
}

impl BoolField {
    pub fn new() -> Self {
        Self::default()
    }

    meta_builders!();
}

impl Field for BoolField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        "boolean".to_string()
    }

    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        match &value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(FieldError::type_mismatch(path.clone(), "boolean", &value)),
        }
    }

    fn introspect(&self, _registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        let mut fragment = serde_json::Map::new();
        fragment.insert("type".into(), json!("boolean"));
        self.meta.annotate(&mut fragment);
        Ok(serde_json::Value::Object(fragment))
    }
}
