//! Node and connection registry with arity checks.

use crate::errors::{ArityError, PipegraphError};
use crate::loader::ConfigLoader;
use crate::model::{Connection, NodeId, NodeKey, Port, PortId, Tree};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// The registered nodes and connections of one build.
///
/// Nodes are keyed by `(kind, name)` and connections by their
/// `(source, target)` ports, so re-registering either is a no-op. Entries
/// are never removed.
#[derive(Debug, Clone)]
pub struct Graph<'t> {
    tree: &'t Tree,
    nodes: IndexMap<NodeKey, NodeId>,
    connections: IndexMap<(PortId, PortId), Connection>,
}

impl<'t> Graph<'t> {
    /// Creates an empty graph over `tree`.
    #[must_use]
    pub fn new(tree: &'t Tree) -> Self {
        Self {
            tree,
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
        }
    }

    /// Returns the tree the graph's handles point into.
    #[must_use]
    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    /// Registers a node. Returns false if an equal node was already present
    /// or the handle does not belong to the graph's tree.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        let Some(entry) = self.tree.get_node(node) else {
            warn!(%node, "Ignoring node from another tree");
            return false;
        };
        let key = entry.key();
        if self.nodes.contains_key(&key) {
            warn!(kind = %key.kind, name = %key.name, "Ignoring duplicate node");
            return false;
        }
        self.nodes.insert(key, node);
        true
    }

    /// Registers a connection. Returns false if a connection between the
    /// same ports was already present, or if an endpoint does not belong to
    /// the graph's tree.
    ///
    /// # Errors
    ///
    /// Returns an [`ArityError`] if either endpoint is a single-connection
    /// input port that already takes part in a registered connection.
    pub fn add_connection(&mut self, connection: Connection) -> Result<bool, ArityError> {
        let endpoints = [connection.source(), connection.target()];
        if let Some(foreign) = endpoints.into_iter().find(|p| self.tree.get_port(*p).is_none()) {
            warn!(port = %foreign, "Ignoring connection with a port from another tree");
            return Ok(false);
        }

        let key = (
            self.canonical(connection.source()),
            self.canonical(connection.target()),
        );
        if self.connections.contains_key(&key) {
            warn!(
                source = %self.tree.port_path(key.0),
                target = %self.tree.port_path(key.1),
                "Ignoring duplicate connection"
            );
            return Ok(false);
        }

        for endpoint in [key.0, key.1] {
            let single = self.tree.get_port(endpoint).is_some_and(Port::is_single_input);
            if single && self.is_connected(endpoint) {
                return Err(ArityError::new(
                    self.tree.port_path(endpoint),
                    format!(
                        "Connection({} -> {})",
                        self.tree.port_path(key.0),
                        self.tree.port_path(key.1)
                    ),
                ));
            }
        }

        self.connections.insert(key, connection);
        Ok(true)
    }

    /// Registers a stage, its descendants and every connection its
    /// templates declare. Returns the number of newly registered connections.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors and arity violations.
    pub fn register_stage(
        &mut self,
        loader: &ConfigLoader,
        stage: NodeId,
    ) -> Result<usize, PipegraphError> {
        let mut pending = vec![stage];
        while let Some(node) = pending.pop() {
            self.add_node(node);
            pending.extend(self.tree.children(node).iter().rev().copied());
        }

        let mut added = 0;
        for connection in loader.create_connections(self.tree, stage)? {
            if self.add_connection(connection)? {
                added += 1;
            }
        }
        debug!(stage = %self.tree.node_path(stage), added, "Registered stage");
        Ok(added)
    }

    /// Iterates the opposite endpoint of every connection touching `port`.
    ///
    /// Endpoints are reported by identity: ports sharing a node, direction
    /// and name all map to the first such port.
    pub fn connected(&self, port: PortId) -> impl Iterator<Item = PortId> + '_ {
        let port = self.canonical(port);
        self.connections.keys().filter_map(move |&(source, target)| {
            if source == port {
                Some(target)
            } else if target == port {
                Some(source)
            } else {
                None
            }
        })
    }

    /// Returns true if `port` takes part in any registered connection.
    #[must_use]
    pub fn is_connected(&self, port: PortId) -> bool {
        self.connected(port).next().is_some()
    }

    /// Finds the first registered node called `name`, optionally of `kind`.
    #[must_use]
    pub fn node(&self, name: &str, kind: Option<&str>) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(key, _)| key.name == name && kind.map_or(true, |kind| key.kind == kind))
            .map(|(_, id)| *id)
    }

    /// Iterates registered nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().copied()
    }

    /// Iterates registered connections in registration order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Returns the number of registered nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Maps a port to the first port of its node with the same direction and
    /// name, so ports with equal identity share one key.
    fn canonical(&self, port: PortId) -> PortId {
        let Some(entry) = self.tree.get_port(port) else {
            return port;
        };
        entry
            .node()
            .and_then(|node| self.tree.find_port(node, entry.direction(), entry.name()))
            .unwrap_or(port)
    }
}
