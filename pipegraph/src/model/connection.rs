//! Connections: directed edges between two ports.

use super::{Metadata, PortId};
use crate::errors::ConfigurationError;
use crate::expression::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A directed edge from a source port to a target port.
///
/// Identity is the `(source, target)` pair; `group`, `internal` and
/// `metadata` do not take part in equality.
#[derive(Debug, Clone)]
pub struct Connection {
    source: PortId,
    target: PortId,
    internal: bool,
    /// Resolved grouping key, if the config declared one.
    pub group: Option<Value>,
    /// Per-connection metadata. Never shared with other connections.
    pub metadata: Metadata,
}

impl Connection {
    /// Creates a new internal connection with no group or metadata.
    #[must_use]
    pub fn new(source: PortId, target: PortId) -> Self {
        Self {
            source,
            target,
            internal: true,
            group: None,
            metadata: Metadata::new(),
        }
    }

    /// Sets whether both endpoints live inside the same stage subtree.
    #[must_use]
    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    /// Sets the group key.
    #[must_use]
    pub fn with_group(mut self, group: Option<Value>) -> Self {
        self.group = group;
        self
    }

    /// Sets the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the source port.
    #[must_use]
    pub fn source(&self) -> PortId {
        self.source
    }

    /// Returns the target port.
    #[must_use]
    pub fn target(&self) -> PortId {
        self.target
    }

    /// Returns the `(source, target)` identity pair.
    #[must_use]
    pub fn key(&self) -> (PortId, PortId) {
        (self.source, self.target)
    }

    /// Returns false for connections resolved from outside the stage.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Returns true if `port` is either endpoint.
    #[must_use]
    pub fn touches(&self, port: PortId) -> bool {
        self.source == port || self.target == port
    }

    /// Returns the endpoint opposite to `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if `port` is not an endpoint of this connection.
    pub fn other(&self, port: PortId) -> Result<PortId, ConfigurationError> {
        if port == self.source {
            Ok(self.target)
        } else if port == self.target {
            Ok(self.source)
        } else {
            Err(ConfigurationError::new(format!(
                "{port} is not an endpoint of {self}"
            )))
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connection({} -> {})", self.source, self.target)
    }
}
