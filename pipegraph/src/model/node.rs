//! Nodes: typed, named entities in a rooted tree.

use super::{Metadata, PortId};
use crate::expression::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Kind tag given to workspace nodes.
pub const WORKSPACE_KIND: &str = "workspace";

/// Opaque handle to a node in a [`Tree`](super::Tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Identity of a node: its kind and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    /// The node kind.
    pub kind: String,
    /// The node name.
    pub name: String,
}

/// A typed, named entity (root, stage or workspace).
///
/// Equality and hashing use `(kind, name)` only; the parent is not part of
/// a node's identity.
#[derive(Debug, Clone)]
pub struct Node {
    kind: String,
    name: String,
    /// Node metadata.
    pub metadata: Metadata,
    pub(crate) ports: Vec<PortId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    /// Creates a new detached node.
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            metadata: Metadata::new(),
            ports: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    /// Sets the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the identity key.
    #[must_use]
    pub fn key(&self) -> NodeKey {
        NodeKey {
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }

    /// Returns true for workspace nodes.
    #[must_use]
    pub fn is_workspace(&self) -> bool {
        self.kind == WORKSPACE_KIND
    }

    /// Returns the parent, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the owned ports in attachment order.
    #[must_use]
    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    /// Returns the `value` of a metadata field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.metadata.value(field)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}, {})", self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_node_identity_is_kind_and_name() {
        let a = Node::new("asset", "assetA");
        let b = Node::new("asset", "assetA").with_metadata(
            Metadata::new().with_field("is_rigged", "bool", Value::Bool(true)),
        );
        let c = Node::new("shot", "assetA");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Node> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_node_metadata_value() {
        let node = Node::new("asset", "assetB")
            .with_metadata(Metadata::new().with_field("is_rigged", "bool", Value::Bool(true)));
        assert_eq!(node.get("is_rigged"), Some(&Value::Bool(true)));
        assert_eq!(node.get("missing"), None);
    }

    #[test]
    fn test_workspace_kind() {
        assert!(Node::new(WORKSPACE_KIND, "modeling").is_workspace());
        assert!(!Node::new("asset", "modeling").is_workspace());
        assert_eq!(Node::new("asset", "a").to_string(), "Node(asset, a)");
    }
}
