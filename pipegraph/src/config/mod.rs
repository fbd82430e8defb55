//! Declarative graph configuration.
//!
//! The configuration arrives already deserialized into a `serde_json::Value`
//! and is parsed once into the typed templates in [`schema`].

mod schema;

pub use schema::{
    ComparisonOperator, ConditionSpec, Conditional, ConnectionSpec, DataBlock,
    DemotedConnection, ExternalConnection, ForeachSpec, GraphConfig, InternalConnection,
    PortBody, PortMap, PortTemplate, PromotedConnection, StageBody, StageTemplate,
    WorkspaceTemplate,
};

use crate::errors::{ConfigurationError, ErrorInfo};

impl GraphConfig {
    /// Parses a configuration tree.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG-SCHEMA` error for unknown connection types,
    /// condition types, comparison operators, port directions or missing
    /// required keys.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        serde_json::from_value(value).map_err(schema_error)
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// See [`GraphConfig::from_value`]; malformed JSON is reported the same way.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(text).map_err(schema_error)
    }

    /// Returns the template for a stage kind.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG-UNKNOWN-STAGE` error if the kind is not declared.
    pub fn stage(&self, kind: &str) -> Result<&StageTemplate, ConfigurationError> {
        self.stages.get(kind).ok_or_else(|| {
            ConfigurationError::coded(
                "CONFIG-UNKNOWN-STAGE",
                format!("Unknown stage kind '{kind}'"),
            )
            .with_path(vec![kind.to_string()])
        })
    }

    /// Returns the declared stage kinds in order.
    pub fn stage_kinds(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str)
    }
}

fn schema_error(err: serde_json::Error) -> ConfigurationError {
    let message = format!("Invalid graph configuration: {err}");
    ConfigurationError::new(message.clone()).with_error_info(
        ErrorInfo::new("CONFIG-SCHEMA", message)
            .with_context_entry("line", err.line().to_string())
            .with_context_entry("column", err.column().to_string()),
    )
}
