//! Testing utilities for pipegraph builds.
//!
//! This module provides:
//! - A production-style project/asset/shot template
//! - A fixture that builds it
//! - Assertions over port paths and connections

mod assertions;
mod fixtures;

pub use assertions::{assert_connection, assert_port_paths, connection_paths};
pub use fixtures::{instance, production_config, PipelineFixture};
