//! Ports: named, directional attachment points on a node.

use super::{Metadata, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque handle to a port in a [`Tree`](super::Tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub(crate) usize);

impl PortId {
    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

/// Which way data flows through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Data flows into the node.
    Input,
    /// Data flows out of the node.
    Output,
}

impl Direction {
    /// Returns the lowercase name used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed attachment point owned by exactly one node.
///
/// A port becomes a *promoted port* when it aggregates workspace ports at
/// stage scope; those ports are listed in [`Port::shared`].
#[derive(Debug, Clone)]
pub struct Port {
    direction: Direction,
    name: String,
    multi: bool,
    promoted: bool,
    /// Port metadata.
    pub metadata: Metadata,
    pub(crate) node: Option<NodeId>,
    pub(crate) shared: Option<Vec<PortId>>,
}

impl Port {
    /// Creates a new, unattached port.
    #[must_use]
    pub fn new(direction: Direction, name: impl Into<String>) -> Self {
        Self {
            direction,
            name: name.into(),
            multi: false,
            promoted: false,
            metadata: Metadata::new(),
            node: None,
            shared: None,
        }
    }

    /// Creates a new promoted port with an empty shared list.
    #[must_use]
    pub fn promoted_port(direction: Direction, name: impl Into<String>, multi: bool) -> Self {
        let mut port = Self::new(direction, name).with_multi(multi);
        port.shared = Some(Vec::new());
        port
    }

    /// Sets whether the port accepts more than one connection.
    #[must_use]
    pub fn with_multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    /// Marks the port for promotion to stage scope.
    #[must_use]
    pub fn with_promote(mut self, promoted: bool) -> Self {
        self.promoted = promoted;
        self
    }

    /// Sets the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the port direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the port name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the port accepts more than one connection.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Returns true if the port was marked for promotion in config.
    #[must_use]
    pub fn is_promoted(&self) -> bool {
        self.promoted
    }

    /// Returns true if this is a stage-level promoted port.
    #[must_use]
    pub fn is_promoted_port(&self) -> bool {
        self.shared.is_some()
    }

    /// Workspace ports this promoted port fans from, in attachment order.
    /// Empty for plain ports.
    #[must_use]
    pub fn shared(&self) -> &[PortId] {
        self.shared.as_deref().unwrap_or(&[])
    }

    /// Returns the owning node, if attached.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Returns true if this is an input port that accepts a single connection.
    #[must_use]
    pub fn is_single_input(&self) -> bool {
        self.direction == Direction::Input && !self.multi
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.direction == other.direction && self.name == other.name
    }
}

impl Eq for Port {}

impl Hash for Port {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
        self.direction.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_promoted_port() { "PromotedPort" } else { "Port" };
        write!(f, "{}({}, {})", kind, self.direction, self.name)
    }
}
