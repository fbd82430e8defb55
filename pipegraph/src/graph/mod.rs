//! The graph registry.
//!
//! A [`Graph`] collects the nodes and connections of a build and enforces
//! that single-connection input ports receive at most one connection.

mod registry;

pub use registry::Graph;
