//! Test assertions over built trees and resolved connections.

use crate::model::{Connection, PortId, Tree};

/// Renders connections as `source -> target` port paths.
#[must_use]
pub fn connection_paths<'a>(
    tree: &Tree,
    connections: impl IntoIterator<Item = &'a Connection>,
) -> Vec<String> {
    connections
        .into_iter()
        .map(|c| format!("{} -> {}", tree.port_path(c.source()), tree.port_path(c.target())))
        .collect()
}

/// Asserts that a connection runs between the given port paths.
pub fn assert_connection(tree: &Tree, connection: &Connection, source: &str, target: &str) {
    let actual = (
        tree.port_path(connection.source()),
        tree.port_path(connection.target()),
    );
    assert_eq!(
        actual,
        (source.to_string(), target.to_string()),
        "Unexpected endpoints for {connection}"
    );
}

/// Asserts that ports have the given paths, in order.
pub fn assert_port_paths(tree: &Tree, ports: &[PortId], expected: &[&str]) {
    let actual: Vec<String> = ports.iter().map(|p| tree.port_path(*p)).collect();
    assert_eq!(actual, expected, "Unexpected ports");
}
