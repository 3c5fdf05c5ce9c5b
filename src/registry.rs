//! Schema registry for named record-type fragments and `$ref` resolution.
//!
//! This module provides the [`SchemaRegistry`] type that turns fields and
//! record types into schema-document fragments. Every record type reached
//! during introspection is registered under its name once; later references
//! to it are emitted as `$ref` pointers to that name.

use std::fmt::{self, Display};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};

use crate::field::{Field, Shape};
use crate::record::{is_internal, RecordRef, RecordType};

/// Prefix of `$ref` pointers, matching the OpenAPI 3 components layout.
pub const DEFAULT_REF_PREFIX: &str = "#/components/schemas/";

/// A registered record type and its fragment.
///
/// `fragment` is `None` while the fragment is being computed; a reference
/// reaching the record type during that window is a cycle and resolves to
/// the reserved name.
struct Entry {
    record_type: Arc<RecordType>,
    fragment: Option<Value>,
}

/// Type alias for the fragment storage map.
type EntryMap = Arc<RwLock<IndexMap<String, Entry>>>;

/// A thread-safe registry of record-type schema fragments.
///
/// Registration is idempotent: a record type's fragment is computed the first
/// time it is registered and never recomputed. Registering a *different*
/// record type under a name already taken is a configuration error.
///
/// # Thread Safety
///
/// The registry uses `Arc<RwLock<...>>`; clones share the same storage. The
/// lock is released while a fragment is computed, so nested registrations do
/// not deadlock.
///
/// # Example
///
/// ```rust
/// use fieldwork::{ListField, ObjectField, RecordType, SchemaRegistry, StringField};
/// use serde_json::json;
///
/// let bar = RecordType::builder("Bar")
///     .field("bar", StringField::new().default_value("bar"))
///     .build();
/// let foo = RecordType::builder("Foo")
///     .field("bar", ObjectField::new(&bar))
///     .build();
///
/// let registry = SchemaRegistry::new();
/// let fragment = registry.introspect(ListField::new(&foo)).unwrap();
///
/// assert_eq!(
///     fragment,
///     json!({"type": "array", "items": {"$ref": "#/components/schemas/Foo"}})
/// );
/// assert_eq!(
///     registry.get("Bar").unwrap(),
///     json!({"type": "object", "properties": {"bar": {"type": "string", "default": "bar"}}})
/// );
/// ```
pub struct SchemaRegistry {
    entries: EntryMap,
    ref_prefix: String,
    /// Names reserved by the registration in progress, set only on the
    /// scoped view a top-level `register` computes fragments through.
    reserved: Option<Mutex<Vec<String>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry using [`DEFAULT_REF_PREFIX`].
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(IndexMap::new())),
            ref_prefix: DEFAULT_REF_PREFIX.to_string(),
            reserved: None,
        }
    }

    /// Sets the prefix prepended to record-type names in `$ref` pointers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fieldwork::SchemaRegistry;
    ///
    /// let registry = SchemaRegistry::new().with_ref_prefix("#/$defs/");
    /// assert_eq!(registry.ref_prefix(), "#/$defs/");
    /// ```
    pub fn with_ref_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ref_prefix = prefix.into();
        self
    }

    pub fn ref_prefix(&self) -> &str {
        &self.ref_prefix
    }

    /// Emits the schema fragment for a field or record type.
    ///
    /// Record types reached anywhere in the shape are registered; a bare
    /// record type yields a `$ref`.
    pub fn introspect(&self, shape: impl Into<Shape>) -> Result<Value, RegistryError> {
        shape.into().introspect(self)
    }

    /// Registers `record_type` under its name and returns the name.
    ///
    /// The name is reserved before the fields are introspected, so a record
    /// type that refers to itself, directly or through others, terminates.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateName` if a different record type is
    /// already registered under the same name. A failed registration leaves
    /// no entry behind, including the entries of nested record types it
    /// reached before failing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fieldwork::{IntField, RecordType, SchemaRegistry};
    ///
    /// let apple = RecordType::builder("Apple")
    ///     .field("size", IntField::new().min_value(1).max_value(10))
    ///     .build();
    /// let registry = SchemaRegistry::new();
    ///
    /// assert_eq!(registry.register(&apple).unwrap(), "Apple");
    /// assert_eq!(registry.register(&apple).unwrap(), "Apple");
    ///
    /// let impostor = RecordType::builder("Apple").build();
    /// assert!(registry.register(&impostor).is_err());
    /// ```
    pub fn register(&self, record_type: &Arc<RecordType>) -> Result<String, RegistryError> {
        if self.reserved.is_some() {
            return self.register_scoped(record_type);
        }

        let scope = Self {
            entries: Arc::clone(&self.entries),
            ref_prefix: self.ref_prefix.clone(),
            reserved: Some(Mutex::new(Vec::new())),
        };
        let result = scope.register_scoped(record_type);
        if let (Err(_), Some(reserved)) = (&result, &scope.reserved) {
            let reserved = std::mem::take(&mut *reserved.lock());
            let mut entries = self.entries.write();
            for name in &reserved {
                entries.shift_remove(name);
            }
            tracing::debug!(rolled_back = reserved.len(), "rolled back failed registration");
        }
        result
    }

    fn register_scoped(&self, record_type: &Arc<RecordType>) -> Result<String, RegistryError> {
        let name = record_type.name().to_string();
        {
            let mut entries = self.entries.write();
            if let Some(entry) = entries.get(&name) {
                if !Arc::ptr_eq(&entry.record_type, record_type) {
                    tracing::warn!(record = %name, "rejected registration of a different record type under a taken name");
                    return Err(RegistryError::DuplicateName(name));
                }
                if entry.fragment.is_none() {
                    tracing::debug!(record = %name, "cyclic reference resolved to reserved name");
                }
                return Ok(name);
            }
            entries.insert(
                name.clone(),
                Entry {
                    record_type: Arc::clone(record_type),
                    fragment: None,
                },
            );
        }
        if let Some(reserved) = &self.reserved {
            reserved.lock().push(name.clone());
        }

        let fragment = self.object_fragment(record_type)?;
        if let Some(entry) = self.entries.write().get_mut(&name) {
            entry.fragment = Some(fragment);
        }
        tracing::debug!(record = %name, "registered schema fragment");
        Ok(name)
    }

    /// Registers the record type behind `target` and returns a `$ref` to it.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::SchemaNotFound` if `target` refers to a record
    /// type that has been dropped.
    pub fn reference(&self, target: &RecordRef) -> Result<Value, RegistryError> {
        let record_type = target
            .get()
            .ok_or_else(|| RegistryError::SchemaNotFound(target.name()))?;
        let name = self.register(&record_type)?;
        Ok(json!({ "$ref": format!("{}{}", self.ref_prefix, name) }))
    }

    /// Retrieves a registered fragment by record-type name.
    ///
    /// Returns `None` if the name is unknown or its fragment is still being
    /// computed.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries
            .read()
            .get(name)
            .and_then(|entry| entry.fragment.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// All registered fragments keyed by name, in registration order.
    ///
    /// This is the `components.schemas` section of an API document.
    pub fn components(&self) -> Value {
        let entries = self.entries.read();
        let schemas: serde_json::Map<String, Value> = entries
            .iter()
            .filter_map(|(name, entry)| {
                entry
                    .fragment
                    .as_ref()
                    .map(|fragment| (name.clone(), fragment.clone()))
            })
            .collect();
        Value::Object(schemas)
    }

    /// Describes each public field of `record_type` as an API parameter.
    ///
    /// Path parameters are always marked required.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fieldwork::{IntField, ParameterLocation, RecordType, SchemaRegistry};
    /// use serde_json::json;
    ///
    /// let query = RecordType::builder("Query")
    ///     .field("start", IntField::new())
    ///     .field("end", IntField::new().max_value(100))
    ///     .build();
    ///
    /// let parameters = SchemaRegistry::new()
    ///     .parameters(&query, ParameterLocation::Query)
    ///     .unwrap();
    /// assert_eq!(
    ///     parameters[1],
    ///     json!({
    ///         "name": "end",
    ///         "in": "query",
    ///         "description": "",
    ///         "required": false,
    ///         "schema": {"type": "integer", "maximum": 100}
    ///     })
    /// );
    /// ```
    pub fn parameters(
        &self,
        record_type: &RecordType,
        location: ParameterLocation,
    ) -> Result<Vec<Value>, RegistryError> {
        let mut parameters = Vec::new();
        for (key, field) in record_type.fields() {
            if is_internal(key) {
                continue;
            }
            let meta = field.meta();
            parameters.push(json!({
                "name": key,
                "in": location.as_str(),
                "description": meta.description.clone().unwrap_or_default(),
                "required": meta.required || location == ParameterLocation::Path,
                "schema": field.introspect(self)?,
            }));
        }
        Ok(parameters)
    }

    fn object_fragment(&self, record_type: &RecordType) -> Result<Value, RegistryError> {
        let mut properties = serde_json::Map::new();
        for (key, field) in record_type.fields() {
            if is_internal(key) {
                continue;
            }
            properties.insert(key.to_string(), field.introspect(self)?);
        }

        let mut fragment = serde_json::Map::new();
        fragment.insert("type".into(), json!("object"));
        fragment.insert("properties".into(), Value::Object(properties));

        let required: Vec<&str> = record_type
            .required_keys()
            .iter()
            .map(String::as_str)
            .filter(|key| !is_internal(key))
            .collect();
        if !required.is_empty() {
            fragment.insert("required".into(), json!(required));
        }
        if let Some(description) = record_type.description() {
            fragment.insert("description".into(), json!(description));
        }
        Ok(Value::Object(fragment))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SchemaRegistry {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ref_prefix: self.ref_prefix.clone(),
            reserved: None,
        }
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("names", &self.names())
            .field("ref_prefix", &self.ref_prefix)
            .finish()
    }
}

/// Where an API parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Path => "path",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

impl Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Attempted to register a different record type under a taken name.
    #[error("schema '{0}' already registered")]
    DuplicateName(String),

    /// A reference points at a record type that no longer exists.
    #[error("schema '{0}' not found")]
    SchemaNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{IntField, ListField, ObjectField, StringField};
    use serde_json::json;

    #[test]
    fn test_registration_is_idempotent() {
        let apple = RecordType::builder("Apple")
            .field("size", IntField::new().min_value(1).max_value(10))
            .build();
        let registry = SchemaRegistry::new();

        registry.register(&apple).unwrap();
        let first = registry.get("Apple").unwrap();
        registry.register(&apple).unwrap();
        assert_eq!(registry.get("Apple").unwrap(), first);
        assert_eq!(registry.names(), vec!["Apple".to_string()]);
        assert_eq!(
            first,
            json!({"type": "object", "properties": {"size": {"type": "integer", "minimum": 1, "maximum": 10}}})
        );
    }

    #[test]
    fn test_duplicate_name_rolls_back_partial_registration() {
        let first = RecordType::builder("Item").build();
        let second = RecordType::builder("Item").field("x", IntField::new()).build();
        let holder = RecordType::builder("Holder")
            .field("item", ObjectField::new(&second))
            .build();

        let registry = SchemaRegistry::new();
        registry.register(&first).unwrap();
        assert_eq!(
            registry.register(&holder).unwrap_err(),
            RegistryError::DuplicateName("Item".into())
        );
        assert!(!registry.contains("Holder"));
    }

    #[test]
    fn test_failed_registration_removes_nested_entries() {
        let first = RecordType::builder("Item").build();
        let second = RecordType::builder("Item").field("x", IntField::new()).build();
        let tag = RecordType::builder("Tag").field("label", StringField::new()).build();
        let holder = RecordType::builder("Holder")
            .field("tags", ListField::new(&tag))
            .field("item", ObjectField::new(&second))
            .build();

        let registry = SchemaRegistry::new();
        registry.register(&first).unwrap();
        assert!(registry.register(&holder).is_err());
        assert_eq!(registry.names(), vec!["Item".to_string()]);

        registry.register(&tag).unwrap();
        assert_eq!(registry.get("Tag").unwrap(), json!({"type": "object", "properties": {"label": {"type": "string"}}}));
    }

    #[test]
    fn test_failed_cyclic_registration_removes_every_entry() {
        let first = RecordType::builder("Item").build();
        let second = RecordType::builder("Item").field("x", IntField::new()).build();
        let outer = RecordType::builder("Outer").build_cyclic(|builder, this| {
            let child = RecordType::builder("Child")
                .field("parent", ObjectField::new(&this))
                .field("item", ObjectField::new(&second))
                .build();
            builder.field("child", ObjectField::new(&child))
        });

        let registry = SchemaRegistry::new();
        registry.register(&first).unwrap();
        assert_eq!(
            registry.register(&outer).unwrap_err(),
            RegistryError::DuplicateName("Item".into())
        );
        assert_eq!(registry.names(), vec!["Item".to_string()]);
        assert!(registry.get("Item").is_some());
    }

    #[test]
    fn test_self_reference_terminates() {
        let node = RecordType::builder("Node").build_cyclic(|builder, this| {
            builder
                .field("value", IntField::new().required())
                .field("children", ListField::new(this))
        });
        let registry = SchemaRegistry::new();

        assert_eq!(registry.introspect(&node).unwrap(), json!({"$ref": "#/components/schemas/Node"}));
        assert_eq!(
            registry.get("Node").unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "value": {"type": "integer"},
                    "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
                },
                "required": ["value"]
            })
        );
    }

    #[test]
    fn test_internal_fields_are_not_documented() {
        let record_type = RecordType::builder("Session")
            .doc("A login session.")
            .field("user", StringField::new().required())
            .field("_secret", StringField::new().required())
            .build();
        let registry = SchemaRegistry::new();
        registry.register(&record_type).unwrap();

        assert_eq!(
            registry.get("Session").unwrap(),
            json!({
                "type": "object",
                "properties": {"user": {"type": "string"}},
                "required": ["user"],
                "description": "A login session."
            })
        );
        let parameters = registry.parameters(&record_type, ParameterLocation::Header).unwrap();
        assert_eq!(parameters.len(), 1);
    }

    #[test]
    fn test_clones_share_storage() {
        let registry = SchemaRegistry::new().with_ref_prefix("#/$defs/");
        let other = registry.clone();
        let empty = RecordType::builder("Empty").build();

        assert_eq!(other.introspect(&empty).unwrap(), json!({"$ref": "#/$defs/Empty"}));
        assert!(registry.contains("Empty"));
    }
}
