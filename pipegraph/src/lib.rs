//! # Pipegraph
//!
//! Builds production-pipeline dependency graphs from declarative stage
//! templates.
//!
//! A template describes stage kinds (project, asset, shot, ...), the
//! workspaces inside them and the ports those workspaces expose. Pipegraph
//! turns it into:
//!
//! - **A node tree**: stages, workspaces and ports, with conditional
//!   branches resolved against stage metadata
//! - **Promoted ports**: stage-level ports aggregating same-named workspace
//!   ports
//! - **Connections**: internal, foreach, promoted and demoted edges between
//!   ports
//! - **A graph registry**: deduplicated nodes and connections with
//!   single-input arity checks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipegraph::prelude::*;
//!
//! let loader = ConfigLoader::from_value(config)?;
//! let mut tree = Tree::new();
//! let project = loader.create_stage_node(&mut tree, "project", "project", Metadata::new(), None)?;
//! let asset = loader.create_stage_node(&mut tree, "asset", "assetA", Metadata::new(), Some(project))?;
//!
//! let mut graph = Graph::new(&tree);
//! graph.register_stage(&loader, project)?;
//! graph.register_stage(&loader, asset)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod errors;
pub mod expression;
pub mod graph;
pub mod loader;
pub mod model;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConditionSpec, ConnectionSpec, GraphConfig, StageTemplate};
    pub use crate::errors::{
        ArityError, ConfigurationError, ErrorInfo, ExpressionError, LookupError, PipegraphError,
    };
    pub use crate::expression::{evaluate, Expression, Keywords, Value};
    pub use crate::graph::Graph;
    pub use crate::loader::ConfigLoader;
    pub use crate::model::{
        Connection, Direction, Metadata, Node, NodeId, Port, PortId, Tree,
    };
}
