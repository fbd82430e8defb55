//! Node, port and connection model.
//!
//! This module provides:
//! - An arena ([`Tree`]) owning nodes and ports, addressed by handles
//! - Nodes with `(kind, name)` identity
//! - Ports and promoted ports with `(node, direction, name)` identity
//! - Connections with `(source, target)` identity
//! - Typed metadata descriptors

mod connection;
mod metadata;
mod node;
mod port;
mod tree;

pub use connection::Connection;
pub use metadata::{Metadata, MIXED_SUBTYPE};
pub use node::{Node, NodeId, NodeKey, WORKSPACE_KIND};
pub use port::{Direction, Port, PortId};
pub use tree::{Checkpoint, Tree};
