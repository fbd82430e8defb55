//! Typed metadata maps.
//!
//! Each field maps to a descriptor `{type, value, ...}`. Descriptors are
//! stored as [`Value::Map`]s so callers can carry extra keys (e.g. `subtype`).

use crate::expression::Value;
use indexmap::IndexMap;

/// Descriptor subtype marking nested descriptors inside a `dict`/`list`.
pub const MIXED_SUBTYPE: &str = "mixed";

/// Ordered mapping from field name to value descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    fields: IndexMap<String, Value>,
}

impl Metadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds metadata from a configuration block.
    #[must_use]
    pub fn from_json(data: &IndexMap<String, serde_json::Value>) -> Self {
        Self {
            fields: data
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        }
    }

    /// Adds a `{type, value}` descriptor.
    #[must_use]
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.set_field(name, type_tag, value);
        self
    }

    /// Inserts or replaces a `{type, value}` descriptor.
    pub fn set_field(
        &mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.fields
            .insert(name.into(), descriptor(type_tag.into(), value.into()));
    }

    /// Inserts a raw descriptor.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: Value) -> Option<Value> {
        self.fields.insert(name.into(), descriptor)
    }

    /// Returns the raw descriptor for a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the `value` entry of a field's descriptor.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name)? {
            Value::Map(map) => map.get("value"),
            _ => None,
        }
    }

    /// Returns a mutable reference to the `value` entry of a field.
    pub fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self.fields.get_mut(name)? {
            Value::Map(map) => map.get_mut("value"),
            _ => None,
        }
    }

    /// Returns true if the field exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterates over `(field, descriptor)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a copy of `self` with `overrides` applied on top.
    ///
    /// The merge is shallow: a field present in `overrides` replaces the
    /// whole descriptor, nested maps included.
    #[must_use]
    pub fn merged(&self, overrides: Metadata) -> Self {
        let mut fields = self.fields.clone();
        fields.extend(overrides.fields);
        Self { fields }
    }

    /// Collapses descriptors into plain values.
    ///
    /// `dict` and `list` descriptors with a `mixed` subtype hold nested
    /// descriptors and are collapsed recursively.
    #[must_use]
    pub fn collapse(&self) -> IndexMap<String, Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), collapse_descriptor(v)))
            .collect()
    }

    /// Returns the descriptors as a [`Value::Map`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Map(self.fields.clone())
    }
}

impl FromIterator<(String, Value)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn descriptor(type_tag: String, value: Value) -> Value {
    let mut map = IndexMap::new();
    map.insert("type".to_string(), Value::String(type_tag));
    map.insert("value".to_string(), value);
    Value::Map(map)
}

fn collapse_descriptor(descriptor: &Value) -> Value {
    let Value::Map(map) = descriptor else {
        return descriptor.clone();
    };
    let value = map.get("value").cloned().unwrap_or_default();
    let is_mixed = map.get("subtype").and_then(Value::as_str) == Some(MIXED_SUBTYPE);
    if !is_mixed {
        return value;
    }

    match (map.get("type").and_then(Value::as_str), value) {
        (Some("dict"), Value::Map(entries)) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), collapse_descriptor(v)))
                .collect(),
        ),
        (Some("list"), Value::List(items)) => {
            Value::List(items.iter().map(collapse_descriptor).collect())
        }
        (_, other) => other,
    }
}
