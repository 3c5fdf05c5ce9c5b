//! Record types: compiled field declarations and their validated instances.
//!
//! A [`RecordType`] is built once from an ordered list of named fields. Each
//! field's canonical key is its alias when one is set, otherwise the member
//! name it was declared under. Instances ([`Record`]) are constructed from a
//! mapping plus optional keyword overrides, validated field by field, and
//! serialized back with [`Record::to_dict`].
//!
//! # Example
//!
//! ```rust
//! use fieldwork::{IntField, RecordType, StringField, ToDictOptions, Value};
//! use serde_json::json;
//!
//! let demo = RecordType::builder("Demo")
//!     .field("age", IntField::new().min_value(10).max_value(20).required())
//!     .field("name", StringField::new().default_value("test"))
//!     .build();
//!
//! let record = demo.new(Value::from(json!({"age": 11})), false).unwrap();
//! assert_eq!(record.to_json(&ToDictOptions::default()), json!({"age": 11}));
//! ```

mod serialize;

use std::fmt::{self, Display};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use stillwater::Validation;

use crate::error::{FieldError, FieldErrors};
use crate::field::Field;
use crate::path::FieldPath;
use crate::value::{Map, Value};

pub use serialize::ToDictOptions;

/// Keys starting with this prefix are internal: stored and validated, but
/// never serialized or documented.
const INTERNAL_PREFIX: char = '_';

pub(crate) fn is_internal(key: &str) -> bool {
    key.starts_with(INTERNAL_PREFIX)
}

/// A declared field together with the member name it was declared under.
#[derive(Debug, Clone)]
struct Slot {
    member: String,
    field: Arc<dyn Field>,
}

/// A compiled record shape.
pub struct RecordType {
    name: String,
    description: Option<String>,
    fields: IndexMap<String, Slot>,
    required: Vec<String>,
    constants: Map,
}

impl RecordType {
    /// Starts declaring a record type called `name`.
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            description: None,
            members: Vec::new(),
            constants: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared fields by canonical key, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &dyn Field)> {
        self.fields
            .iter()
            .map(|(key, slot)| (key.as_str(), slot.field.as_ref()))
    }

    pub fn field(&self, key: &str) -> Option<&dyn Field> {
        self.fields.get(key).map(|slot| slot.field.as_ref())
    }

    /// The member name a canonical key was declared under.
    pub fn member_name(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|slot| slot.member.as_str())
    }

    pub fn declares(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Canonical keys of required fields, in declaration order.
    pub fn required_keys(&self) -> &[String] {
        &self.required
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    /// Constructs an instance from `input` (a mapping, an instance, or null).
    ///
    /// With `fill_defaults`, absent fields are stored with their default.
    pub fn new(self: &Arc<Self>, input: Value, fill_defaults: bool) -> Result<Record, FieldError> {
        self.init().mapping(input).fill_defaults(fill_defaults).build()
    }

    /// Starts a construction with keyword overrides and options.
    pub fn init(self: &Arc<Self>) -> RecordInit {
        RecordInit {
            record_type: Arc::clone(self),
            mapping: Value::Null,
            args: Map::new(),
            fill_defaults: false,
        }
    }

    /// Validates every field of `input` and reports all failures at once.
    ///
    /// Each field contributes at most one error; missing required fields are
    /// reported alongside invalid ones. Success yields the same record that
    /// [`new`](RecordType::new) would.
    pub fn check(self: &Arc<Self>, input: &Value) -> Validation<Record, FieldErrors> {
        let root = FieldPath::root();
        let mut mapping = match entries(input.clone(), &root, &self.name) {
            Ok(mapping) => mapping,
            Err(error) => return Validation::Failure(FieldErrors::single(error)),
        };

        let mut values = Map::new();
        let mut errors = Vec::new();
        for (key, slot) in &self.fields {
            let path = root.push_field(key);
            match take_present(&mut mapping, key) {
                Some(value) => match slot.field.validate_at(value, &path) {
                    Ok(validated) => {
                        values.insert(key.clone(), validated);
                    }
                    Err(error) => errors.push(error),
                },
                None if slot.field.meta().required => errors.push(FieldError::missing(path)),
                None => {}
            }
        }

        match FieldErrors::from_vec(errors) {
            Some(errors) => Validation::Failure(errors),
            None => Validation::Success(Record {
                record_type: Arc::clone(self),
                values,
            }),
        }
    }

    /// True if `value` could be an instance of this type: an instance of it,
    /// or a mapping (or record) whose keys are all declared here.
    pub fn is_plausible(self: &Arc<Self>, value: &Value) -> bool {
        match value {
            Value::Record(record) if Arc::ptr_eq(&record.record_type, self) => true,
            Value::Record(record) => record.values.keys().all(|key| self.declares(key)),
            Value::Map(map) => map.keys().all(|key| self.declares(key)),
            _ => false,
        }
    }

    /// Turns `value` into an instance of this type: instances pass through,
    /// mappings are constructed.
    pub(crate) fn coerce(self: &Arc<Self>, value: Value, path: &FieldPath) -> Result<Record, FieldError> {
        match value {
            Value::Record(record) if Arc::ptr_eq(&record.record_type, self) => Ok(record),
            other => self.construct(entries(other, path, &self.name)?, Map::new(), false, path),
        }
    }

    fn construct(
        self: &Arc<Self>,
        mut mapping: Map,
        mut args: Map,
        fill_defaults: bool,
        path: &FieldPath,
    ) -> Result<Record, FieldError> {
        let mut values = Map::new();
        let mut satisfied = Vec::new();

        for (key, slot) in &self.fields {
            let present = take_present(&mut args, key).or_else(|| take_present(&mut mapping, key));
            match present {
                Some(value) => {
                    let validated = slot.field.validate_at(value, &path.push_field(key))?;
                    values.insert(key.clone(), validated);
                    satisfied.push(key.as_str());
                }
                None if fill_defaults => {
                    values.insert(key.clone(), slot.field.meta().absent_value());
                }
                None => {}
            }
        }

        if let Some(key) = self.required.iter().find(|key| !satisfied.contains(&key.as_str())) {
            return Err(FieldError::missing(path.push_field(key)));
        }

        Ok(Record {
            record_type: Arc::clone(self),
            values,
        })
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("required", &self.required)
            .finish()
    }
}

/// Extracts the key/value entries of a construction input.
fn entries(input: Value, path: &FieldPath, record: &str) -> Result<Map, FieldError> {
    match input {
        Value::Null => Ok(Map::new()),
        Value::Map(map) => Ok(map),
        Value::Record(record) => Ok(record.values),
        other => Err(FieldError::type_mismatch(
            path.clone(),
            format!("mapping for {}", record),
            &other,
        )),
    }
}

/// Removes `key` from `map`, treating a stored null as absent.
fn take_present(map: &mut Map, key: &str) -> Option<Value> {
    map.shift_remove(key).filter(|value| !value.is_null())
}

/// Declares the fields and constants of a [`RecordType`].
///
/// Fields are kept in declaration order. Declaring two fields with the same
/// canonical key keeps the position of the first and the field of the last.
pub struct RecordTypeBuilder {
    name: String,
    description: Option<String>,
    members: Vec<(String, Arc<dyn Field>)>,
    constants: Map,
}

impl RecordTypeBuilder {
    /// Human description, emitted on the record's schema fragment.
    pub fn doc(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares a field under `member`; an alias on the field overrides the key.
    pub fn field<F: Field + 'static>(mut self, member: impl Into<String>, field: F) -> Self {
        self.members.push((member.into(), Arc::new(field)));
        self
    }

    /// Declares a shared field instance.
    pub fn shared_field(mut self, member: impl Into<String>, field: Arc<dyn Field>) -> Self {
        self.members.push((member.into(), field));
        self
    }

    /// Declares a read-only attribute carried unchanged by every instance.
    ///
    /// Constants are not validated, serialized, or documented.
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Arc<RecordType> {
        Arc::new(self.compile())
    }

    /// Builds a record type whose fields may refer back to the type itself.
    ///
    /// `declare` receives the builder and a [`RecordRef`] to the type being
    /// built, usable in `ObjectField`s and `ListField`s.
    ///
    /// ```rust
    /// use fieldwork::{ListField, RecordType, StringField, Value};
    /// use serde_json::json;
    ///
    /// let comment = RecordType::builder("Comment").build_cyclic(|builder, this| {
    ///     builder
    ///         .field("text", StringField::new().required())
    ///         .field("replies", ListField::new(this))
    /// });
    ///
    /// let thread = json!({"text": "top", "replies": [{"text": "reply"}]});
    /// assert!(comment.new(Value::from(thread), false).is_ok());
    /// ```
    pub fn build_cyclic<F>(self, declare: F) -> Arc<RecordType>
    where
        F: FnOnce(RecordTypeBuilder, RecordRef) -> RecordTypeBuilder,
    {
        Arc::new_cyclic(|this| declare(self, RecordRef::Cyclic(this.clone())).compile())
    }

    fn compile(self) -> RecordType {
        let mut fields: IndexMap<String, Slot> = IndexMap::new();
        for (member, field) in self.members {
            let key = field.meta().name.clone().unwrap_or_else(|| member.clone());
            fields.insert(key, Slot { member, field });
        }
        let required: Vec<String> = fields
            .iter()
            .filter(|(_, slot)| slot.field.meta().required)
            .map(|(key, _)| key.clone())
            .collect();

        tracing::debug!(
            record = %self.name,
            fields = fields.len(),
            required = required.len(),
            "compiled record type"
        );

        RecordType {
            name: self.name,
            description: self.description,
            fields,
            required,
            constants: self.constants,
        }
    }
}

/// A handle on a record type held by fields that recurse into it.
///
/// Ordinary references are strong. References created by
/// [`RecordTypeBuilder::build_cyclic`] point back at the type that owns the
/// field and are weak, so a self-referential type can still be dropped.
#[derive(Debug, Clone)]
pub enum RecordRef {
    Strong(Arc<RecordType>),
    Cyclic(Weak<RecordType>),
}

impl RecordRef {
    pub fn get(&self) -> Option<Arc<RecordType>> {
        match self {
            RecordRef::Strong(record_type) => Some(Arc::clone(record_type)),
            RecordRef::Cyclic(record_type) => record_type.upgrade(),
        }
    }

    /// The record type's name, or `<dropped>` if it no longer exists.
    pub fn name(&self) -> String {
        self.get()
            .map(|record_type| record_type.name().to_string())
            .unwrap_or_else(|| "<dropped>".to_string())
    }

    pub(crate) fn resolve(&self, path: &FieldPath) -> Result<Arc<RecordType>, FieldError> {
        self.get()
            .ok_or_else(|| FieldError::type_mismatch(path.clone(), "a live record type", &Value::Null))
    }
}

impl From<Arc<RecordType>> for RecordRef {
    fn from(record_type: Arc<RecordType>) -> Self {
        RecordRef::Strong(record_type)
    }
}

impl From<&Arc<RecordType>> for RecordRef {
    fn from(record_type: &Arc<RecordType>) -> Self {
        RecordRef::Strong(Arc::clone(record_type))
    }
}

impl From<&RecordRef> for RecordRef {
    fn from(target: &RecordRef) -> Self {
        target.clone()
    }
}

/// A construction in progress; see [`RecordType::init`].
///
/// ```rust
/// use fieldwork::{IntField, RecordType, StringField, Value};
/// use serde_json::json;
///
/// let server = RecordType::builder("Server")
///     .field("host", StringField::new().default_value("example.com"))
///     .field("port", IntField::new().default_value(80))
///     .build();
///
/// let record = server
///     .init()
///     .mapping(Value::from(json!({"host": "a.example", "port": 8080})))
///     .arg("port", 9090)
///     .build()
///     .unwrap();
/// assert_eq!(record.get("port").unwrap(), Some(&Value::Int(9090)));
/// ```
pub struct RecordInit {
    record_type: Arc<RecordType>,
    mapping: Value,
    args: Map,
    fill_defaults: bool,
}

impl RecordInit {
    /// The mapping (or instance) to read field values from.
    pub fn mapping(mut self, mapping: impl Into<Value>) -> Self {
        self.mapping = mapping.into();
        self
    }

    /// A keyword value; takes precedence over the mapping for the same key.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn fill_defaults(mut self, enabled: bool) -> Self {
        self.fill_defaults = enabled;
        self
    }

    pub fn build(self) -> Result<Record, FieldError> {
        let root = FieldPath::root();
        let mapping = entries(self.mapping, &root, self.record_type.name())?;
        self.record_type
            .construct(mapping, self.args, self.fill_defaults, &root)
    }
}

/// A validated instance of a [`RecordType`].
///
/// Only declared keys can be read or written. Writes re-validate through the
/// field's `validate`.
#[derive(Clone)]
pub struct Record {
    record_type: Arc<RecordType>,
    values: Map,
}

impl Record {
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn name(&self) -> &str {
        self.record_type.name()
    }

    /// Reads a declared field or constant.
    ///
    /// Returns `Ok(None)` for a declared field that holds no value, and an
    /// `AttributeAccessError` for any key the record type does not declare.
    pub fn get(&self, key: &str) -> Result<Option<&Value>, FieldError> {
        if self.record_type.declares(key) {
            return Ok(self.values.get(key));
        }
        match self.record_type.constant(key) {
            Some(constant) => Ok(Some(constant)),
            None => Err(FieldError::attribute(
                self.name(),
                key,
                "not a declared field",
            )),
        }
    }

    /// Validates `value` with the field declared under `key` and stores it.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), FieldError> {
        let field = match self.record_type.fields.get(key) {
            Some(slot) => Arc::clone(&slot.field),
            None if self.record_type.constant(key).is_some() => {
                return Err(FieldError::attribute(
                    self.name(),
                    key,
                    "constants are read-only",
                ))
            }
            None => {
                return Err(FieldError::attribute(
                    self.name(),
                    key,
                    "not a declared field",
                ))
            }
        };
        let validated = field.validate(key, value.into())?;
        self.values.insert(key.to_string(), validated);
        Ok(())
    }

    /// Whether a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The stored values, keyed by canonical key.
    pub fn values(&self) -> &Map {
        &self.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Record")
            .field(&self.record_type.name)
            .field(&self.values)
            .finish()
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.record_type, &other.record_type) && self.values == other.values
    }
}
