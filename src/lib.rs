//! # Fieldwork
//!
//! Declarative field validation and record types with schema introspection.
//!
//! ## Overview
//!
//! Fields validate and normalize one value slot: `"12"` becomes `12` for an
//! integer field, a JSON text becomes a list for a list field, and a mapping
//! becomes a record instance for an object field. Record types are compiled
//! once from an ordered list of named fields and construct validated
//! instances that serialize back to plain mappings. A [`SchemaRegistry`]
//! turns fields and record types into OpenAPI-style schema fragments,
//! registering every record type it meets under its name.
//!
//! ## Core Types
//!
//! - [`Field`]: the validation contract shared by every field variant
//! - [`Schema`]: entry point for declaring fields
//! - [`RecordType`] / [`Record`]: compiled record shapes and their instances
//! - [`FieldError`]: a single failure, located by a [`FieldPath`]
//! - [`FieldErrors`]: a non-empty collection of failures from [`RecordType::check`]
//! - [`SchemaRegistry`]: named schema fragments and `$ref` resolution
//!
//! ## Example
//!
//! ```rust
//! use fieldwork::{Field, ListField, RecordType, Schema, SchemaRegistry, ToDictOptions, Value};
//! use serde_json::json;
//!
//! let age = Schema::int().min_value(10).max_value(20).required();
//! assert_eq!(age.validate("age", Value::Int(11)).unwrap(), Value::Int(11));
//! assert_eq!(age.validate("age", Value::Int(25)).unwrap_err().code(), "max_value");
//!
//! let demo = RecordType::builder("Demo")
//!     .field("age", age)
//!     .field("name", Schema::string().default_value("test"))
//!     .build();
//! let record = demo.new(Value::from(json!({"age": 11})), false).unwrap();
//! assert_eq!(record.to_json(&ToDictOptions::default()), json!({"age": 11}));
//!
//! let registry = SchemaRegistry::new();
//! let fragment = registry.introspect(ListField::new(&demo)).unwrap();
//! assert_eq!(fragment["items"], json!({"$ref": "#/components/schemas/Demo"}));
//! ```

pub mod error;
pub mod field;
pub mod path;
pub mod record;
pub mod registry;
pub mod value;

pub use error::{Bound, ErrorKind, FieldError, FieldErrors};
pub use field::{
    AllOfField, AnyField, AnyOfField, BoolField, Field, FieldMeta, FloatField, IntField,
    ListField, ObjectField, Schema, Shape, StringField,
};
pub use path::{FieldPath, PathSegment};
pub use record::{Record, RecordInit, RecordRef, RecordType, RecordTypeBuilder, ToDictOptions};
pub use registry::{ParameterLocation, RegistryError, SchemaRegistry, DEFAULT_REF_PREFIX};
pub use value::{Map, Value};

/// Type alias for accumulating validation results using FieldErrors
pub type ValidationResult<T> = stillwater::Validation<T, FieldErrors>;
