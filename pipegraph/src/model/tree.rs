//! Arena owning every node and port of a build.
//!
//! Parent, child and owning-node links are [`NodeId`]/[`PortId`] handles into
//! the arena, so there are no reference cycles between parents and children
//! or between ports and nodes.

use super::{Direction, Metadata, Node, NodeId, Port, PortId};
use crate::errors::ConfigurationError;

/// Arena sizes captured by [`Tree::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    nodes: usize,
    ports: usize,
}

/// Owns the nodes and ports of one or more rooted trees.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    ports: Vec<Port>,
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a detached node and returns its handle.
    pub fn insert_node(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        node.ports.clear();
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Creates a node and attaches it to `parent` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a node of this tree.
    pub fn add_node(
        &mut self,
        kind: impl Into<String>,
        name: impl Into<String>,
        metadata: Metadata,
        parent: Option<NodeId>,
    ) -> Result<NodeId, ConfigurationError> {
        if let Some(parent) = parent {
            self.check_node(parent)?;
        }
        let id = self.insert_node(Node::new(kind, name).with_metadata(metadata));
        if let Some(parent) = parent {
            self.attach(id, parent)?;
        }
        Ok(id)
    }

    /// Links `child` under `parent`, setting both sides at once.
    ///
    /// # Errors
    ///
    /// Returns an error if `child` already has a parent, or if the link
    /// would make a node its own ancestor.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<(), ConfigurationError> {
        self.check_node(child)?;
        self.check_node(parent)?;
        if let Some(existing) = self.nodes[child.0].parent {
            return Err(ConfigurationError::new(format!(
                "{} is already attached to {}",
                self.nodes[child.0], self.nodes[existing.0]
            )));
        }
        if self.ancestors(parent).any(|id| id == child) || child == parent {
            return Err(ConfigurationError::new(format!(
                "Attaching {} under {} would create a cycle",
                self.nodes[child.0], self.nodes[parent.0]
            )));
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Stores an unattached port and returns its handle.
    pub fn insert_port(&mut self, mut port: Port) -> PortId {
        port.node = None;
        self.ports.push(port);
        PortId(self.ports.len() - 1)
    }

    /// Attaches a port to `node`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port already belongs to a node.
    pub fn attach_port(&mut self, node: NodeId, port: PortId) -> Result<(), ConfigurationError> {
        self.check_node(node)?;
        self.check_port(port)?;
        if let Some(owner) = self.ports[port.0].node {
            return Err(ConfigurationError::coded(
                "CONFIG-PORT-ATTACHED",
                format!(
                    "{} already belongs to {}",
                    self.ports[port.0],
                    self.node_path(owner)
                ),
            )
            .with_path(self.node_segments(node)));
        }

        self.ports[port.0].node = Some(node);
        self.nodes[node.0].ports.push(port);
        Ok(())
    }

    /// Creates a port and attaches it to `node`.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is not a node of this tree.
    pub fn add_port(&mut self, node: NodeId, port: Port) -> Result<PortId, ConfigurationError> {
        self.check_node(node)?;
        let id = self.insert_port(port);
        self.attach_port(node, id)?;
        Ok(id)
    }

    /// Appends `member` to the shared list of a promoted port.
    ///
    /// # Errors
    ///
    /// Returns an error if `promoted` is not a promoted port.
    pub fn share(&mut self, promoted: PortId, member: PortId) -> Result<(), ConfigurationError> {
        self.check_port(member)?;
        self.check_port(promoted)?;
        if !self.ports[promoted.0].is_promoted_port() {
            return Err(ConfigurationError::coded(
                "CONFIG-PROMOTION-CONFLICT",
                format!("{} exists but is not a promoted port", self.ports[promoted.0]),
            )
            .with_path(self.port_segments(promoted)));
        }

        self.ports[promoted.0]
            .shared
            .get_or_insert_with(Vec::new)
            .push(member);
        Ok(())
    }

    /// Returns a node.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns a node mutably.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this tree.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Returns a node if the handle is valid.
    #[must_use]
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Returns a port.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this tree.
    #[must_use]
    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    /// Returns a port mutably.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this tree.
    pub fn port_mut(&mut self, id: PortId) -> &mut Port {
        &mut self.ports[id.0]
    }

    /// Returns a port if the handle is valid.
    #[must_use]
    pub fn get_port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.0)
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(Node::parent)
    }

    /// Returns the children of a node in insertion order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get_node(id).map_or(&[], Node::children)
    }

    /// Returns the first child called `name`.
    #[must_use]
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].name() == name)
    }

    /// Returns the ports of a node in attachment order.
    #[must_use]
    pub fn ports(&self, id: NodeId) -> &[PortId] {
        self.get_node(id).map_or(&[], Node::ports)
    }

    /// Returns the first port of `node` matching direction and name.
    #[must_use]
    pub fn find_port(&self, node: NodeId, direction: Direction, name: &str) -> Option<PortId> {
        self.ports(node).iter().copied().find(|port| {
            let port = &self.ports[port.0];
            port.direction() == direction && port.name() == name
        })
    }

    /// Returns the node owning a port.
    #[must_use]
    pub fn port_node(&self, id: PortId) -> Option<NodeId> {
        self.get_port(id).and_then(Port::node)
    }

    /// Iterates from a node's parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Returns true if two nodes have the same `(kind, name)` identity.
    #[must_use]
    pub fn same_node(&self, a: NodeId, b: NodeId) -> bool {
        a == b
            || matches!(
                (self.get_node(a), self.get_node(b)),
                (Some(x), Some(y)) if x == y
            )
    }

    /// Returns the names from the root down to `id`.
    #[must_use]
    pub fn node_segments(&self, id: NodeId) -> Vec<String> {
        let mut segments: Vec<String> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|node| self.get_node(node).map(|n| n.name().to_string()))
            .collect();
        segments.reverse();
        segments
    }

    /// Returns the names from the root down to the port.
    #[must_use]
    pub fn port_segments(&self, id: PortId) -> Vec<String> {
        let Some(port) = self.get_port(id) else {
            return Vec::new();
        };
        let mut segments = port.node().map(|n| self.node_segments(n)).unwrap_or_default();
        segments.push(port.name().to_string());
        segments
    }

    /// Dotted path of a node, e.g. `pipeline.assetA.modeling`.
    #[must_use]
    pub fn node_path(&self, id: NodeId) -> String {
        self.node_segments(id).join(".")
    }

    /// Dotted path of a port, e.g. `pipeline.assetA.modeling.model`.
    #[must_use]
    pub fn port_path(&self, id: PortId) -> String {
        self.port_segments(id).join(".")
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of ports.
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Records the current arena sizes for a later [`Tree::rollback`].
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.nodes.len(),
            ports: self.ports.len(),
        }
    }

    /// Drops every node and port created since `checkpoint`, along with the
    /// links older nodes hold to them.
    ///
    /// Handles issued after the checkpoint become invalid.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.nodes.truncate(checkpoint.nodes);
        self.ports.truncate(checkpoint.ports);
        for node in &mut self.nodes {
            node.children.retain(|child| child.0 < checkpoint.nodes);
            node.ports.retain(|port| port.0 < checkpoint.ports);
        }
        for port in &mut self.ports {
            if let Some(shared) = port.shared.as_mut() {
                shared.retain(|member| member.0 < checkpoint.ports);
            }
        }
    }

    fn check_node(&self, id: NodeId) -> Result<(), ConfigurationError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(ConfigurationError::new(format!("{id} does not belong to this tree")))
        }
    }

    fn check_port(&self, id: PortId) -> Result<(), ConfigurationError> {
        if id.0 < self.ports.len() {
            Ok(())
        } else {
            Err(ConfigurationError::new(format!("{id} does not belong to this tree")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.add_node("root", "pipeline", Metadata::new(), None).unwrap();
        let asset = tree.add_node("asset", "assetA", Metadata::new(), Some(root)).unwrap();
        let modeling = tree
            .add_node("workspace", "modeling", Metadata::new(), Some(asset))
            .unwrap();
        (tree, root, asset, modeling)
    }

    #[test]
    fn test_attach_sets_both_links() {
        let (tree, root, asset, modeling) = small_tree();
        assert_eq!(tree.parent(asset), Some(root));
        assert_eq!(tree.children(root), &[asset]);
        assert_eq!(tree.child(asset, "modeling"), Some(modeling));
        assert_eq!(tree.child(asset, "rigging"), None);
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn test_attach_twice_fails() {
        let (mut tree, root, asset, _) = small_tree();
        assert!(tree.attach(asset, root).is_err());
        assert_eq!(tree.children(root).len(), 1);
    }

    #[test]
    fn test_attach_cycle_fails() {
        let (mut tree, _, _, _) = small_tree();
        let a = tree.insert_node(Node::new("x", "a"));
        let b = tree.insert_node(Node::new("x", "b"));
        tree.attach(b, a).unwrap();
        assert!(tree.attach(a, b).is_err());
        assert!(tree.attach(a, a).is_err());
    }

    #[test]
    fn test_child_returns_first_match() {
        let (mut tree, _, asset, modeling) = small_tree();
        tree.add_node("workspace", "modeling", Metadata::new(), Some(asset)).unwrap();
        assert_eq!(tree.child(asset, "modeling"), Some(modeling));
        assert_eq!(tree.children(asset).len(), 2);
    }

    #[test]
    fn test_port_attach_once() {
        let (mut tree, _, asset, modeling) = small_tree();
        let port = tree.insert_port(Port::new(Direction::Output, "model"));
        tree.attach_port(modeling, port).unwrap();

        let err = tree.attach_port(asset, port).unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-PORT-ATTACHED"));
        assert_eq!(tree.port_node(port), Some(modeling));
        assert!(tree.ports(asset).is_empty());
    }

    #[test]
    fn test_find_port_and_paths() {
        let (mut tree, _, _, modeling) = small_tree();
        let out = tree.add_port(modeling, Port::new(Direction::Output, "model")).unwrap();
        tree.add_port(modeling, Port::new(Direction::Input, "model")).unwrap();

        assert_eq!(tree.find_port(modeling, Direction::Output, "model"), Some(out));
        assert_eq!(tree.find_port(modeling, Direction::Output, "rig"), None);
        assert_eq!(tree.port_path(out), "pipeline.assetA.modeling.model");
        assert_eq!(tree.node_path(modeling), "pipeline.assetA.modeling");
    }

    #[test]
    fn test_share_requires_promoted_port() {
        let (mut tree, _, asset, modeling) = small_tree();
        let member = tree.add_port(modeling, Port::new(Direction::Output, "model")).unwrap();
        let plain = tree.add_port(asset, Port::new(Direction::Output, "model")).unwrap();
        let err = tree.share(plain, member).unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-PROMOTION-CONFLICT"));

        let promoted = tree
            .add_port(asset, Port::promoted_port(Direction::Output, "rig", false))
            .unwrap();
        tree.share(promoted, member).unwrap();
        assert_eq!(tree.port(promoted).shared(), &[member]);
    }

    #[test]
    fn test_rollback_detaches_new_entries() {
        let (mut tree, root, asset, modeling) = small_tree();
        let model = tree.add_port(modeling, Port::new(Direction::Output, "model")).unwrap();
        let checkpoint = tree.checkpoint();

        let shot = tree.add_node("shot", "shotA", Metadata::new(), Some(root)).unwrap();
        tree.add_port(shot, Port::new(Direction::Input, "model")).unwrap();
        tree.add_port(asset, Port::new(Direction::Output, "extra")).unwrap();
        tree.rollback(checkpoint);

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.port_count(), 1);
        assert_eq!(tree.children(root), &[asset]);
        assert!(tree.ports(asset).is_empty());
        assert_eq!(tree.ports(modeling), &[model]);
        assert_eq!(tree.get_node(shot).map(Node::name), None);
    }

    #[test]
    fn test_same_node_uses_identity() {
        let mut tree = Tree::new();
        let a = tree.insert_node(Node::new("asset", "assetA"));
        let b = tree.insert_node(Node::new("asset", "assetA"));
        let c = tree.insert_node(Node::new("asset", "assetB"));
        assert!(tree.same_node(a, b));
        assert!(!tree.same_node(a, c));
    }
}
