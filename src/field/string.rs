//! String field validation.
//!
//! This module provides [`StringField`] for validating text with length
//! bounds and a pattern that must match the whole string.

use regex::Regex;
use serde_json::json;

use crate::error::{Bound, ErrorKind, FieldError};
use crate::path::FieldPath;
use crate::registry::{RegistryError, SchemaRegistry};
use crate::value::Value;

use super::{meta_builders, Field, FieldMeta};

/// A compiled pattern, anchored at both ends, with the source kept for
/// diagnostics and schema output.
#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    anchored: Regex,
}

/// A field for text values.
///
/// Lengths count Unicode scalar values, not bytes. A configured pattern must
/// match the entire string; a match of only a prefix is a failure.
///
/// # Example
///
/// ```rust
/// use fieldwork::{Field, StringField, Value};
///
/// let code = StringField::new().min_length(2).max_length(4).pattern(r"[a-z]+").unwrap();
///
/// assert!(code.validate("code", Value::from("abc")).is_ok());
/// assert!(code.validate("code", Value::from("abc1")).is_err()); // prefix match only
/// assert!(code.validate("code", Value::from("a")).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct StringField {
    meta: FieldMeta,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Pattern>,
    format: Option<String>,
}

impl Default for StringField {
    fn default() -> Self {
        Self {
            meta: FieldMeta::with_fallback(Value::String(String::new())),
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
        }
    }
}

impl StringField {
    pub fn new() -> Self {
        Self::default()
    }

    meta_builders!();

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Requires the whole string to match `pattern`.
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{})$", pattern))?;
        self.pattern = Some(Pattern {
            source: pattern.to_string(),
            anchored,
        });
        Ok(self)
    }

    /// Documentation-only format tag, e.g. `email` or `date-time`.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

impl Field for StringField {
    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn label(&self) -> String {
        "string".to_string()
    }

    fn coerce(&self, value: Value, path: &FieldPath) -> Result<Value, FieldError> {
        let s = match value {
            Value::String(s) => s,
            other => return Err(FieldError::type_mismatch(path.clone(), "string", &other)),
        };

        let len = s.chars().count();
        let bound = match (self.min_length, self.max_length) {
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
                    unit: "characters",
                },
            ));
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.anchored.is_match(&s) {
                return Err(FieldError::new(
                    path.clone(),
                    ErrorKind::PatternMismatch {
                        pattern: pattern.source.clone(),
                        got: s,
                    },
                ));
            }
        }

        Ok(Value::String(s))
    }

    fn introspect(&self, _registry: &SchemaRegistry) -> Result<serde_json::Value, RegistryError> {
        let mut fragment = serde_json::Map::new();
        fragment.insert("type".into(), json!("string"));
        if let Some(min) = self.min_length {
            fragment.insert("minLength".into(), json!(min));
        }
        if let Some(max) = self.max_length {
            fragment.insert("maxLength".into(), json!(max));
        }
        if let Some(pattern) = &self.pattern {
            fragment.insert("pattern".into(), json!(pattern.source));
        }
        if let Some(format) = &self.format {
            fragment.insert("format".into(), json!(format));
        }
        self.meta.annotate(&mut fragment);
        Ok(serde_json::Value::Object(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_text() {
        let field = StringField::new();
        let error = field.validate("name", Value::Int(3)).unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::TypeMismatch {
                expected: "string".into(),
                got: "integer".into()
            }
        );
    }

    #[test]
    fn test_length_bounds_are_inclusive() {
        let field = StringField::new().min_length(2).max_length(4);
        assert!(field.validate("host", "ab".into()).is_ok());
        assert!(field.validate("host", "abcd".into()).is_ok());
        assert_eq!(field.validate("host", "a".into()).unwrap_err().code(), "min_length");
        assert_eq!(field.validate("host", "abcde".into()).unwrap_err().code(), "max_length");
    }

    #[test]
    fn test_length_counts_characters() {
        let field = StringField::new().max_length(3);
        assert!(field.validate("name", "日本語".into()).is_ok());
        assert!(field.validate("name", "日本語!".into()).is_err());
    }

    #[test]
    fn test_pattern_must_match_whole_string() {
        let field = StringField::new().pattern(r"\d+").unwrap();
        assert!(field.validate("zip", "12345".into()).is_ok());

        let error = field.validate("zip", "123ab".into()).unwrap_err();
        assert_eq!(error.code(), "pattern");
        assert!(error.to_string().contains(r"\d+"));

        assert!(field.validate("zip", "ab123".into()).is_err());
    }

    #[test]
    fn test_alternation_is_anchored_as_a_group() {
        let field = StringField::new().pattern("http|https").unwrap();
        assert!(field.validate("protocol", "https".into()).is_ok());
        assert!(field.validate("protocol", "httpx".into()).is_err());
    }

    #[test]
    fn test_invalid_pattern_is_rejected_at_declaration() {
        assert!(StringField::new().pattern("[unclosed").is_err());
    }

    #[test]
    fn test_length_checked_before_pattern() {
        let field = StringField::new().min_length(5).pattern(r"\d+").unwrap();
        let error = field.validate("zip", "ab".into()).unwrap_err();
        assert_eq!(error.code(), "min_length");
    }
}
