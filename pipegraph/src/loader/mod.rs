//! Builds node structure and connections from stage templates.
//!
//! Building a stage is a two-step process: [`ConfigLoader::create_stage_node`]
//! materializes the stage, its workspaces and ports, then
//! [`ConfigLoader::create_connections`] resolves the connections those
//! templates declare against the tree built so far. Stages referenced by
//! foreach loops must exist before their consumers' connections are
//! resolved.

pub mod cascade;
mod connections;
mod structure;

#[cfg(test)]
mod integration_tests;

pub use cascade::{all_conditions, condition_holds, Cascade, PortEntry, PortScope};

use crate::config::GraphConfig;
use crate::errors::ConfigurationError;
use crate::model::Metadata;

/// Resolves stage templates into nodes, ports and connections.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: GraphConfig,
}

impl ConfigLoader {
    /// Creates a loader over a parsed configuration.
    #[must_use]
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Parses a configuration tree and creates a loader over it.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG-SCHEMA` error if the configuration does not match
    /// the template schema.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        GraphConfig::from_value(value).map(Self::new)
    }

    /// Returns the parsed configuration.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Returns a copy of a stage kind's default metadata.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG-UNKNOWN-STAGE` error if the kind is not declared.
    pub fn stage_defaults(&self, kind: &str) -> Result<Metadata, ConfigurationError> {
        self.config.stage(kind).map(|template| Metadata::from_json(&template.data))
    }
}
