//! Union and intersection fields.
//!
//! - [`AnyOfField`]: the value must satisfy one alternative; alternatives are
//!   tried in declaration order and the first success wins.
//! - [`AllOfField`]: the value is a list with one candidate per alternative,
//!   and every candidate must satisfy its positional alternative.
//!
//! # Example
//!
//! ```rust
//! use fieldwork::{AllOfField, AnyOfField, Field, IntField, StringField, Value};
//!
//! // Flexible id: integer or non-empty string
//! let id = AnyOfField::new([IntField::new()])
//!     .alternative(StringField::new().min_length(1));
//! assert_eq!(id.validate("id", Value::from("7")).unwrap(), Value::Int(7));
//!
//! // Positional pair: (integer, string)
//! let pair = AllOfField::new([IntField::new()]).alternative(StringField::new());
//! let value = pair.validate("pair", Value::from(serde_json::json!([1, "a"]))).unwrap();
//! assert_eq!(value, Value::from(serde_json::json!([1, "a"])));
//! ```

use serde_json::json;

use crate::error::{ErrorKind, FieldError};
use crate::path::FieldPath;
use crate::registry::{RegistryError, SchemaRegistry};
use crate::value::Value;

use super::{meta_builders, Field, FieldMeta, Shape};

/// A union field: the first alternative accepting the value wins.
///
/// Record-type alternatives (bare record types or object fields) are only
/// attempted when the value is a plausible instance: an instance of that type,
/// or a mapping whose keys are all declared by it. Other values skip them.
#[derive(Debug, Clone)]
pub struct AnyOfField {
    meta: FieldMeta,
    alternatives: Vec<Shape>,
    to_dict: bool,
}

impl AnyOfField {
    pub fn new<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Shape>,
    {
        Self {
            meta: FieldMeta::default(),
            alternatives: alternatives.into_iter().map(Into::into).collect(),
            to_dict: false,
        }
    }

    meta_builders!();

    /// Appends an alternative, tried after all existing ones.
    pub fn alternative(mut self, shape: impl Into<Shape>) -> Self {
        self.alternatives.push(shape.into());
        self
    }

    /// Emits record results as plain mappings.
    pub fn to_dict(mut self, enabled: bool) -> Self {
        self.to_dict = enabled;
        self
    }

    pub fn alternatives(&self) -> &[Shape] {
        &self.alternatives
    }
}

impl Field for AnyOfField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        format!("any of [{}]", labels(&self.alternatives).join(", "))
    }

    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        for (index, alternative) in self.alternatives.iter().enumerate() {
            if let Some(record_type) = alternative.record_target() {
                if !record_type.is_plausible(&value) {
                    tracing::trace!(%path, index, record = record_type.name(), "skipping implausible alternative");
                    continue;
                }
            }
            match alternative.validate_at(value.clone(), path, self.to_dict) {
                Ok(validated) => return Ok(validated),
                Err(error) => {
                    tracing::trace!(%path, index, %error, "alternative rejected value");
                }
            }
        }

        Err(FieldError::new(
            path.clone(),
            ErrorKind::UnionExhausted {
                alternatives: labels(&self.alternatives),
            },
        ))
    }

    fn introspect(&self, registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        let alternatives = self
            .alternatives
            .iter()
            .map(|alternative| alternative.introspect(registry))
            .collect::<Result<Vec<_>, _>>()?;
        let mut fragment = serde_json::Map::new();
        fragment.insert("anyOf".into(), json!(alternatives));
        self.meta.annotate(&mut fragment);
        Ok(serde_json::Value::Object(fragment))
    }
}

/// An intersection field: one candidate per alternative, all must validate.
///
/// The output is the list of validated candidates in alternative order. Any
/// present list is validated item by item, including lists whose first item
/// is `0`, `""` or `false`; only an absent value counts as missing.
#[derive(Debug, Clone)]
pub struct AllOfField {
    meta: FieldMeta,
    alternatives: Vec<Shape>,
    to_dict: bool,
}

impl AllOfField {
    pub fn new<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Shape>,
    {
        Self {
            meta: FieldMeta::default(),
            alternatives: alternatives.into_iter().map(Into::into).collect(),
            to_dict: false,
        }
    }

    meta_builders!();

    pub fn alternative(mut self, shape: impl Into<Shape>) -> Self {
        self.alternatives.push(shape.into());
        self
    }

    pub fn to_dict(mut self, enabled: bool) -> Self {
        self.to_dict = enabled;
        self
    }

    pub fn alternatives(&self) -> &[Shape] {
        &self.alternatives
    }
}

impl Field for AllOfField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        format!("all of [{}]", labels(&self.alternatives).join(", "))
    }

    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        let candidates = match value {
            Value::List(candidates) => candidates,
            other => return Err(FieldError::type_mismatch(path.clone(), "array", &other)),
        };
        if candidates.len() != self.alternatives.len() {
            return Err(FieldError::new(
                path.clone(),
                ErrorKind::IntersectionCountMismatch {
                    expected: self.alternatives.len(),
                    got: candidates.len(),
                },
            ));
        }

        self.alternatives
            .iter()
            .zip(candidates)
            .enumerate()
            .map(|(index, (alternative, candidate))| {
                alternative.validate_at(candidate, &path.push_index(index), self.to_dict)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn introspect(&self, registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        let alternatives = self
            .alternatives
            .iter()
            .map(|alternative| alternative.introspect(registry))
            .collect::<Result<Vec<_>, _>>()?;
        let mut fragment = serde_json::Map::new();
        fragment.insert("allOf".into(), json!(alternatives));
        self.meta.annotate(&mut fragment);
        Ok(serde_json::Value::Object(fragment))
    }
}

fn labels(alternatives: &[Shape]) -> Vec<String> {
    alternatives.iter().map(Shape::label).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{BoolField, FloatField, IntField, StringField};
    use serde_json::json;

    #[test]
    fn test_any_of_first_success_wins() {
        // "5" satisfies both; the string alternative is declared first
        let field = AnyOfField::new([Shape::from(StringField::new()), Shape::from(IntField::new())]);
        assert_eq!(field.validate("id", "5".into()).unwrap(), Value::String("5".into()));

        let field = AnyOfField::new([Shape::from(IntField::new()), Shape::from(StringField::new())]);
        assert_eq!(field.validate("id", "5".into()).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_any_of_falls_through_failures() {
        let field = AnyOfField::new([IntField::new().max_value(10)]).alternative(StringField::new());
        assert_eq!(field.validate("id", Value::Int(3)).unwrap(), Value::Int(3));
        assert_eq!(field.validate("id", "abc".into()).unwrap(), Value::String("abc".into()));
    }

    #[test]
    fn test_any_of_exhausted_lists_alternatives() {
        let field = AnyOfField::new([IntField::new()]).alternative(BoolField::new());
        let error = field.validate("flag", Value::List(vec![])).unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::UnionExhausted {
                alternatives: vec!["integer".into(), "boolean".into()]
            }
        );
        assert_eq!(error.path.to_string(), "flag");
    }

    #[test]
    fn test_any_of_absent_uses_default() {
        let field = AnyOfField::new([IntField::new()]).default_value(1);
        assert_eq!(field.validate("n", Value::Null).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_all_of_pairs_positionally() {
        let field = AllOfField::new([Shape::from(IntField::new()), Shape::from(FloatField::new())]);
        assert_eq!(
            field.validate("pair", Value::from(json!(["1", 2]))).unwrap(),
            Value::List(vec![Value::Int(1), Value::Float(2.0)])
        );
    }

    #[test]
    fn test_all_of_count_mismatch() {
        let field = AllOfField::new([Shape::from(IntField::new()), Shape::from(StringField::new())]);
        let error = field.validate("pair", Value::from(json!([1]))).unwrap_err();
        assert_eq!(error.kind, ErrorKind::IntersectionCountMismatch { expected: 2, got: 1 });

        let error = field.validate("pair", Value::from(json!([1, "a", "b"]))).unwrap_err();
        assert_eq!(error.code(), "all_of_count_mismatch");
    }

    #[test]
    fn test_all_of_failure_names_position() {
        let field = AllOfField::new([Shape::from(IntField::new()), Shape::from(StringField::new())]);
        let error = field.validate("pair", Value::from(json!([1, 2]))).unwrap_err();
        assert_eq!(error.path.to_string(), "pair[1]");
        assert_eq!(error.code(), "invalid_type");
    }

    #[test]
    fn test_all_of_requires_sequence() {
        let field = AllOfField::new([IntField::new()]);
        assert_eq!(field.validate("one", Value::Int(1)).unwrap_err().code(), "invalid_type");
    }

    // Absence is decided on the whole candidate list. A list whose first
    // candidate is falsy is still a present value and is validated normally.
    #[test]
    fn test_all_of_leading_falsy_candidate_is_validated() {
        let field = AllOfField::new([Shape::from(IntField::new()), Shape::from(StringField::new())]);
        assert_eq!(
            field.validate("pair", Value::from(json!([0, ""]))).unwrap(),
            Value::from(json!([0, ""]))
        );

        let required = AllOfField::new([BoolField::new()]).required();
        assert_eq!(
            required.validate("flags", Value::from(json!([false]))).unwrap(),
            Value::from(json!([false]))
        );
        assert_eq!(required.validate("flags", Value::Null).unwrap_err().code(), "required");
    }
}
