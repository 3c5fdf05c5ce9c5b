//! Field validation error types.

use std::fmt::{self, Display};

use stillwater::prelude::*;

use crate::path::FieldPath;
use crate::value::Value;

/// An inclusive limit that a value or a length fell outside of.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    AtLeast(String),
    AtMost(String),
}

impl Bound {
    pub fn at_least(limit: impl ToString) -> Self {
        Bound::AtLeast(limit.to_string())
    }

    pub fn at_most(limit: impl ToString) -> Self {
        Bound::AtMost(limit.to_string())
    }

    fn is_lower(&self) -> bool {
        matches!(self, Bound::AtLeast(_))
    }
}

impl Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::AtLeast(limit) => write!(f, "at least {}", limit),
            Bound::AtMost(limit) => write!(f, "at most {}", limit),
        }
    }
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("required field is missing")]
    MissingRequiredField,

    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("must be {bound}, got {got}")]
    RangeViolation { bound: Bound, got: String },

    #[error("length must be {bound} {unit}, got {got}")]
    LengthViolation {
        bound: Bound,
        got: usize,
        unit: &'static str,
    },

    #[error("'{got}' does not fully match pattern '{pattern}'")]
    PatternMismatch { pattern: String, got: String },

    #[error("{got} is not one of {allowed}")]
    EnumViolation { allowed: String, got: String },

    #[error("value did not match any of [{}]", .alternatives.join(", "))]
    UnionExhausted { alternatives: Vec<String> },

    #[error("expected {expected} values, one per alternative, got {got}")]
    IntersectionCountMismatch { expected: usize, got: usize },

    #[error("cannot access '{attribute}' on {record}: {reason}")]
    AttributeAccessError {
        record: String,
        attribute: String,
        reason: &'static str,
    },
}

/// A validation failure located by the path to the faulty value.
///
/// # Example
///
/// ```rust
/// use fieldwork::{ErrorKind, Field, IntField, Value};
///
/// let age = IntField::new().min_value(10).max_value(20).required();
/// let error = age.validate("age", Value::Int(25)).unwrap_err();
///
/// assert!(matches!(error.kind, ErrorKind::RangeViolation { .. }));
/// assert_eq!(error.code(), "max_value");
/// assert_eq!(error.to_string(), "age: must be at most 20, got 25");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Where the failure happened, starting at the validated field.
    pub path: FieldPath,
    pub kind: ErrorKind,
}

impl FieldError {
    pub fn new(path: FieldPath, kind: ErrorKind) -> Self {
        Self { path, kind }
    }

    pub fn missing(path: FieldPath) -> Self {
        Self::new(path, ErrorKind::MissingRequiredField)
    }

    pub fn type_mismatch(path: FieldPath, expected: impl Into<String>, got: &Value) -> Self {
        Self::new(
            path,
            ErrorKind::TypeMismatch {
                expected: expected.into(),
                got: got.type_name().to_string(),
            },
        )
    }

    pub fn attribute(record: &str, attribute: &str, reason: &'static str) -> Self {
        Self::new(
            FieldPath::from_field(attribute),
            ErrorKind::AttributeAccessError {
                record: record.to_string(),
                attribute: attribute.to_string(),
                reason,
            },
        )
    }

    /// Machine-readable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match &self.kind {
            ErrorKind::MissingRequiredField => "required",
            ErrorKind::TypeMismatch { .. } => "invalid_type",
            ErrorKind::RangeViolation { bound, .. } if bound.is_lower() => "min_value",
            ErrorKind::RangeViolation { .. } => "max_value",
            ErrorKind::LengthViolation { bound, .. } if bound.is_lower() => "min_length",
            ErrorKind::LengthViolation { .. } => "max_length",
            ErrorKind::PatternMismatch { .. } => "pattern",
            ErrorKind::EnumViolation { .. } => "enum",
            ErrorKind::UnionExhausted { .. } => "any_of_none_matched",
            ErrorKind::IntersectionCountMismatch { .. } => "all_of_count_mismatch",
            ErrorKind::AttributeAccessError { .. } => "unknown_attribute",
        }
    }

    /// The top-level field the failure belongs to, if any.
    pub fn field(&self) -> Option<&str> {
        self.path.head_field()
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "(root): {}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl std::error::Error for FieldError {}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<FieldError>();
    assert_sync::<FieldError>();
};

/// A non-empty collection of field errors, produced by accumulating checks.
///
/// `FieldErrors` implements `Semigroup`, so results of independent checks
/// can be merged:
///
/// ```rust
/// use fieldwork::{FieldError, FieldErrors, FieldPath};
/// use stillwater::prelude::*;
///
/// let a = FieldErrors::single(FieldError::missing(FieldPath::from_field("age")));
/// let b = FieldErrors::single(FieldError::missing(FieldPath::from_field("name")));
/// assert_eq!(a.combine(b).len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldErrors(NonEmptyVec<FieldError>);

impl FieldErrors {
    pub fn single(error: FieldError) -> Self {
        Self(NonEmptyVec::singleton(error))
    }

    /// Wraps `errors`, or returns `None` when there is nothing to report.
    pub fn from_vec(errors: Vec<FieldError>) -> Option<Self> {
        let mut errors = errors.into_iter();
        let head = Self::single(errors.next()?);
        Some(errors.fold(head, |acc, error| acc.combine(Self::single(error))))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn first(&self) -> &FieldError {
        self.0.head()
    }

    /// Errors whose top-level field is `field`.
    pub fn for_field(&self, field: &str) -> Vec<&FieldError> {
        self.0.iter().filter(|e| e.field() == Some(field)).collect()
    }

    pub fn with_code(&self, code: &str) -> Vec<&FieldError> {
        self.0.iter().filter(|e| e.code() == code).collect()
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0.into_vec()
    }
}

impl Semigroup for FieldErrors {
    fn combine(self, other: Self) -> Self {
        FieldErrors(self.0.combine(other.0))
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed with {} error(s):", self.len())?;
        for (i, error) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl From<FieldError> for FieldErrors {
    fn from(error: FieldError) -> Self {
        FieldErrors::single(error)
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}
