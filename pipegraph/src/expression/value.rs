//! Dynamic values that flow through keyword contexts and metadata.

use crate::model::{NodeId, PortId, Tree};
use indexmap::IndexMap;
use std::fmt;

/// A dynamically typed value.
///
/// `Map` supports key access (`[key]`), `Object` supports attribute access
/// (`.attr`). Nodes and ports are handles into a [`Tree`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    String(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Keyed mapping.
    Map(IndexMap<String, Value>),
    /// Attribute-bearing record.
    Object(IndexMap<String, Value>),
    /// A node handle.
    Node(NodeId),
    /// A port handle.
    Port(PortId),
}

impl Value {
    /// Builds an attribute-bearing record.
    pub fn object<K, V>(attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Object(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds a keyed mapping.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Returns a short name for the value's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "dict",
            Self::Object(_) => "object",
            Self::Node(_) => "node",
            Self::Port(_) => "port",
        }
    }

    /// Coerces to a boolean.
    ///
    /// Null, `false`, zero, and empty strings/lists/maps are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
            Self::Object(_) | Self::Node(_) | Self::Port(_) => true,
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the list items, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the node handle, if this is a node.
    #[must_use]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the port handle, if this is a port.
    #[must_use]
    pub fn as_port(&self) -> Option<PortId> {
        match self {
            Self::Port(id) => Some(*id),
            _ => None,
        }
    }

    /// Looks up a key in a `Map`.
    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Looks up an attribute in an `Object`.
    #[must_use]
    pub fn get_attribute(&self, attribute: &str) -> Option<&Value> {
        match self {
            Self::Object(attributes) => attributes.get(attribute),
            _ => None,
        }
    }

    /// Membership test backing the `in` comparison: `needle in self`.
    ///
    /// Lists test element equality, maps test key presence and strings test
    /// substrings. Returns `None` when `self` is not a container.
    #[must_use]
    pub fn contains(&self, needle: &Value, tree: Option<&Tree>) -> Option<bool> {
        match self {
            Self::List(items) => Some(items.iter().any(|item| item.loosely_equals(needle, tree))),
            Self::Map(map) => Some(needle.as_str().is_some_and(|key| map.contains_key(key))),
            Self::String(haystack) => needle.as_str().map(|s| haystack.contains(s)),
            _ => None,
        }
    }

    /// Equality where nodes compare by `(kind, name)` and numbers compare
    /// across int/float.
    #[must_use]
    pub fn loosely_equals(&self, other: &Value, tree: Option<&Tree>) -> bool {
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => match tree {
                Some(tree) => tree.same_node(*a, *b),
                None => a == b,
            },
            #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => *i as f64 == *f,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y, tree))
            }
            _ => self == other,
        }
    }

    /// Renders the value, naming nodes and ports by path when a tree is given.
    #[must_use]
    pub fn describe(&self, tree: Option<&Tree>) -> String {
        match (self, tree) {
            (Self::Node(id), Some(tree)) => match tree.get_node(*id) {
                Some(node) => node.to_string(),
                None => id.to_string(),
            },
            (Self::Port(id), Some(tree)) => match tree.get_port(*id) {
                Some(_) => format!("Port({})", tree.port_path(*id)),
                None => id.to_string(),
            },
            (Self::List(items), _) => {
                let inner: Vec<String> = items.iter().map(|v| v.describe(tree)).collect();
                format!("[{}]", inner.join(", "))
            }
            (Self::Map(map) | Self::Object(map), _) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.describe(tree)))
                    .collect();
                if matches!(self, Self::Object(_)) {
                    format!("Object{{{}}}", inner.join(", "))
                } else {
                    format!("{{{}}}", inner.join(", "))
                }
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Node(id) => write!(f, "{id}"),
            Self::Port(id) => write!(f, "{id}"),
            Self::List(_) | Self::Map(_) | Self::Object(_) => f.write_str(&self.describe(None)),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NodeId> for Value {
    fn from(value: NodeId) -> Self {
        Self::Node(value)
    }
}

impl From<PortId> for Value {
    fn from(value: PortId) -> Self {
        Self::Port(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, Node};
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let value = Value::from(json!({"a": [1, 2.5, "x", null, true]}));
        assert_eq!(
            value.get_key("a"),
            Some(&Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("x"),
                Value::Null,
                Value::Bool(true),
            ]))
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(Value::object([("a", 1_i64)]).is_truthy());
    }

    #[test]
    fn test_contains() {
        let list = Value::from(json!(["a", "b"]));
        assert_eq!(list.contains(&Value::from("a"), None), Some(true));
        assert_eq!(list.contains(&Value::from("c"), None), Some(false));

        let map = Value::from(json!({"key": 1}));
        assert_eq!(map.contains(&Value::from("key"), None), Some(true));

        let text = Value::from("shotA_main");
        assert_eq!(text.contains(&Value::from("shotA"), None), Some(true));

        assert_eq!(Value::Int(3).contains(&Value::Int(3), None), None);
    }

    #[test]
    fn test_contains_nodes_by_identity() {
        let mut tree = crate::model::Tree::new();
        let a = tree.insert_node(Node::new("asset", "assetA").with_metadata(Metadata::new()));
        let b = tree.insert_node(Node::new("asset", "assetA"));
        let list = Value::List(vec![Value::Node(a)]);
        assert_eq!(list.contains(&Value::Node(b), Some(&tree)), Some(true));
        assert_eq!(list.contains(&Value::Node(b), None), Some(false));
    }

    #[test]
    fn test_describe() {
        let value = Value::object([("name", Value::from("assetA_1")), ("count", Value::Int(2))]);
        assert_eq!(value.describe(None), "Object{name: \"assetA_1\", count: 2}");
        assert_eq!(Value::from(json!({"a": 1})).to_string(), "{a: 1}");
    }
}
