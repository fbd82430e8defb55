//! Resolves the connections a stage's templates declare.

use super::cascade::{all_conditions, port_entries, workspace_entries, PortEntry};
use super::ConfigLoader;
use crate::config::{
    ConnectionSpec, DataBlock, DemotedConnection, ExternalConnection, InternalConnection,
    PromotedConnection,
};
use crate::errors::{ConfigurationError, PipegraphError};
use crate::expression::{evaluate, Keywords, Value};
use crate::model::{Connection, Direction, Metadata, NodeId, PortId, Tree};
use tracing::{debug, info};

impl ConfigLoader {
    /// Resolves every connection declared by the templates of `stage`.
    ///
    /// Workspace ports come first, in cascading order, followed by ports
    /// declared on the stage itself. The structure must already exist; see
    /// [`ConfigLoader::create_stage_node`].
    ///
    /// # Errors
    ///
    /// Returns an error if `stage` is a workspace, a referenced workspace or
    /// port does not exist, or an expression fails to evaluate.
    pub fn create_connections(
        &self,
        tree: &Tree,
        stage: NodeId,
    ) -> Result<Vec<Connection>, PipegraphError> {
        let node = tree.get_node(stage).ok_or_else(|| {
            ConfigurationError::new(format!("{stage} does not belong to this tree"))
        })?;
        if node.is_workspace() {
            return Err(ConfigurationError::coded(
                "CONFIG-NOT-A-STAGE",
                format!("Cannot resolve connections for workspace '{}'", node.name()),
            )
            .with_path(tree.node_segments(stage))
            .into());
        }
        let template = self.config().stage(node.kind())?;

        let mut connections = Vec::new();
        let stage_keywords = Keywords::with_tree(tree).with("stage", stage);

        for (workspace_name, workspace_template) in
            workspace_entries(&template.body, &stage_keywords)?
        {
            let workspace = tree.child(stage, workspace_name).ok_or_else(|| {
                missing_workspace(tree, stage, workspace_name)
            })?;
            let keywords = stage_keywords.clone().with("workspace", workspace);
            for entry in port_entries(&workspace_template.body, &keywords)? {
                resolve_port(tree, workspace, entry, &mut connections)?;
            }
        }

        for entry in port_entries(&template.body, &stage_keywords)? {
            resolve_port(tree, stage, entry, &mut connections)?;
        }

        info!(
            stage = %node.name(),
            kind = %node.kind(),
            count = connections.len(),
            "Connections resolved"
        );
        Ok(connections)
    }
}

fn resolve_port(
    tree: &Tree,
    node: NodeId,
    entry: PortEntry<'_>,
    connections: &mut Vec<Connection>,
) -> Result<(), PipegraphError> {
    if entry.template.connections.is_empty() {
        return Ok(());
    }
    let target = tree
        .find_port(node, entry.direction, entry.name)
        .ok_or_else(|| missing_port(tree, node, entry.direction, entry.name))?;

    for spec in &entry.template.connections {
        let before = connections.len();
        match spec {
            ConnectionSpec::Internal(spec) => connections.push(internal(tree, target, spec)?),
            ConnectionSpec::External(spec) => external(tree, target, spec, connections)?,
            ConnectionSpec::Promoted(spec) => connections.push(promoted(tree, target, spec)?),
            ConnectionSpec::Demoted(spec) => connections.push(demoted(tree, target, spec)?),
        }
        debug!(
            port = %tree.port_path(target),
            connection_type = spec.type_name(),
            count = connections.len() - before,
            "Resolved connections"
        );
    }
    Ok(())
}

fn internal(
    tree: &Tree,
    target: PortId,
    spec: &InternalConnection,
) -> Result<Connection, PipegraphError> {
    let source_node = enclosing(tree, target)?;
    let source = source_port(
        tree,
        source_node,
        spec.workspace.as_deref(),
        spec.port_type.unwrap_or(Direction::Output),
        &spec.port_name,
    )?;
    let group = resolve_group(
        spec.group.as_deref(),
        Keywords::with_tree(tree).with("source", source).with("target", target),
    )?;
    Ok(build(source, target, group, true, &spec.data))
}

fn external(
    tree: &Tree,
    target: PortId,
    spec: &ExternalConnection,
    connections: &mut Vec<Connection>,
) -> Result<(), PipegraphError> {
    let foreach = &spec.foreach;
    let node = owner(tree, target)?;

    let mut keywords = Keywords::with_tree(tree).with("port", target);
    if tree.node(node).is_workspace() {
        keywords.insert("workspace", node);
        keywords.insert("stage", tree.parent(node));
    } else {
        keywords.insert("stage", node);
    }

    let items = match evaluate(&foreach.loop_over, &keywords)? {
        Value::List(items) => items,
        other => {
            return Err(ConfigurationError::coded(
                "CONFIG-LOOP-NOT-SEQUENCE",
                format!(
                    "Loop '{}' resolved to {}, expected a list",
                    foreach.loop_over,
                    other.type_name()
                ),
            )
            .with_path(tree.port_segments(target))
            .into())
        }
    };

    for (index, item) in items.into_iter().enumerate() {
        keywords.insert("item", item.clone());
        if !all_conditions(&foreach.conditions, &keywords)? {
            debug!(port = %tree.port_path(target), index, "Foreach item rejected");
            continue;
        }

        let source_node = evaluate(&foreach.item, &keywords)?.as_node().ok_or_else(|| {
            ConfigurationError::coded(
                "CONFIG-ITEM-NOT-NODE",
                format!("Item expression '{}' did not resolve to a node", foreach.item),
            )
            .with_path(tree.port_segments(target))
        })?;
        let source = source_port(
            tree,
            source_node,
            spec.workspace.as_deref(),
            spec.port_type.unwrap_or(Direction::Output),
            &spec.port_name,
        )?;
        let group = resolve_group(
            foreach.group.as_deref(),
            Keywords::with_tree(tree)
                .with("source", source)
                .with("target", target)
                .with("item", item),
        )?;
        connections.push(build(source, target, group, false, &spec.data));
    }
    Ok(())
}

fn promoted(
    tree: &Tree,
    target: PortId,
    spec: &PromotedConnection,
) -> Result<Connection, PipegraphError> {
    let stage = enclosing(tree, target)?;
    let direction = spec.port_type.unwrap_or(Direction::Input);
    let name = spec.port_name.as_deref().unwrap_or(tree.port(target).name());
    let source = tree.find_port(stage, direction, name).ok_or_else(|| {
        ConfigurationError::coded(
            "CONFIG-MISSING-PORT",
            format!(
                "Promoted port does not exist: {}.port({direction}, '{name}')",
                tree.node(stage).name()
            ),
        )
        .with_path(tree.port_segments(target))
    })?;
    let group = resolve_group(
        spec.group.as_deref(),
        Keywords::with_tree(tree).with("source", source).with("target", target),
    )?;
    Ok(build(source, target, group, true, &spec.data))
}

fn demoted(
    tree: &Tree,
    target: PortId,
    spec: &DemotedConnection,
) -> Result<Connection, PipegraphError> {
    let node = owner(tree, target)?;
    let port = tree.port(target);
    let direction = spec.port_type.unwrap_or(port.direction());
    let name = spec.port_name.as_deref().unwrap_or(port.name());

    let workspace = tree
        .child(node, &spec.workspace)
        .ok_or_else(|| missing_workspace(tree, node, &spec.workspace))?;
    let source = tree.find_port(workspace, direction, name).ok_or_else(|| {
        ConfigurationError::coded(
            "CONFIG-MISSING-PORT",
            format!(
                "Demoted port does not exist: {}.{}.port({direction}, '{name}')",
                tree.node(node).name(),
                spec.workspace
            ),
        )
        .with_path(tree.port_segments(target))
    })?;
    let group = resolve_group(
        spec.group.as_deref(),
        Keywords::with_tree(tree).with("source", source).with("target", target),
    )?;
    Ok(build(source, target, group, true, &spec.data))
}

fn build(
    source: PortId,
    target: PortId,
    group: Option<Value>,
    internal: bool,
    data: &DataBlock,
) -> Connection {
    Connection::new(source, target)
        .with_internal(internal)
        .with_group(group)
        .with_metadata(Metadata::from_json(data))
}

/// Finds a port on `node`, or on its child workspace when one is named.
fn source_port(
    tree: &Tree,
    node: NodeId,
    workspace: Option<&str>,
    direction: Direction,
    name: &str,
) -> Result<PortId, ConfigurationError> {
    let node = match workspace {
        Some(workspace) => tree
            .child(node, workspace)
            .ok_or_else(|| missing_workspace(tree, node, workspace))?,
        None => node,
    };
    tree.find_port(node, direction, name)
        .ok_or_else(|| missing_port(tree, node, direction, name))
}

fn resolve_group(
    expression: Option<&str>,
    keywords: Keywords<'_>,
) -> Result<Option<Value>, PipegraphError> {
    match expression {
        Some(expression) if !expression.is_empty() => Ok(Some(evaluate(expression, &keywords)?)),
        _ => Ok(None),
    }
}

fn owner(tree: &Tree, port: PortId) -> Result<NodeId, ConfigurationError> {
    tree.port_node(port).ok_or_else(|| {
        ConfigurationError::new(format!("{} is not attached to a node", tree.port(port)))
    })
}

/// The parent of the node owning `port`: the stage for workspace ports.
fn enclosing(tree: &Tree, port: PortId) -> Result<NodeId, ConfigurationError> {
    let node = owner(tree, port)?;
    tree.parent(node).ok_or_else(|| {
        ConfigurationError::coded(
            "CONFIG-MISSING-PORT",
            format!(
                "Cannot resolve a source for {}: '{}' has no parent",
                tree.port_path(port),
                tree.node(node).name()
            ),
        )
        .with_path(tree.port_segments(port))
    })
}

fn missing_workspace(tree: &Tree, node: NodeId, workspace: &str) -> ConfigurationError {
    let mut path = tree.node_segments(node);
    path.push(workspace.to_string());
    ConfigurationError::coded(
        "CONFIG-MISSING-WORKSPACE",
        format!("Workspace does not exist: {}.{workspace}", tree.node(node).name()),
    )
    .with_path(path)
}

fn missing_port(tree: &Tree, node: NodeId, direction: Direction, name: &str) -> ConfigurationError {
    let mut path = tree.node_segments(node);
    path.push(name.to_string());
    ConfigurationError::coded(
        "CONFIG-MISSING-PORT",
        format!(
            "Port does not exist: {}.port({direction}, '{name}')",
            tree.node(node).name()
        ),
    )
    .with_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn loader(stages: serde_json::Value) -> ConfigLoader {
        ConfigLoader::new(GraphConfig::from_value(json!({ "stages": stages })).unwrap())
    }

    fn build_stage(loader: &ConfigLoader, tree: &mut Tree, kind: &str, name: &str) -> NodeId {
        loader
            .create_stage_node(tree, kind, name, Metadata::new(), None)
            .unwrap()
    }

    fn code(err: &PipegraphError) -> Option<&str> {
        err.as_configuration().and_then(ConfigurationError::code)
    }

    #[test]
    fn test_internal_connection() {
        let loader = loader(json!({
            "asset": {
                "workspaces": {
                    "modeling": {"ports": {"output": {"model": {}}}},
                    "layout": {"ports": {"input": {"model": {"connections": [
                        {"type": "internal", "workspace": "modeling", "port_name": "model",
                         "data": {"note": {"type": "str", "value": "geo"}}}
                    ]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let asset = build_stage(&loader, &mut tree, "asset", "assetA");

        let connections = loader.create_connections(&tree, asset).unwrap();
        assert_eq!(connections.len(), 1);
        let connection = &connections[0];
        assert_eq!(tree.port_path(connection.source()), "assetA.modeling.model");
        assert_eq!(tree.port_path(connection.target()), "assetA.layout.model");
        assert!(connection.is_internal());
        assert_eq!(connection.group, None);
        assert_eq!(connection.metadata.value("note"), Some(&Value::from("geo")));
    }

    #[test]
    fn test_internal_connection_group() {
        let loader = loader(json!({
            "asset": {
                "workspaces": {
                    "modeling": {"ports": {"output": {"model": {}}}},
                    "layout": {"ports": {"input": {"model": {"connections": [
                        {"type": "internal", "workspace": "modeling", "port_name": "model",
                         "group": "source.node.name"}
                    ]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let asset = build_stage(&loader, &mut tree, "asset", "assetA");

        let connections = loader.create_connections(&tree, asset).unwrap();
        assert_eq!(connections[0].group, Some(Value::from("modeling")));
    }

    #[test]
    fn test_missing_source_port() {
        let loader = loader(json!({
            "asset": {
                "workspaces": {
                    "modeling": {},
                    "layout": {"ports": {"input": {"model": {"connections": [
                        {"type": "internal", "workspace": "modeling", "port_name": "model"}
                    ]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let asset = build_stage(&loader, &mut tree, "asset", "assetA");

        let err = loader.create_connections(&tree, asset).unwrap_err();
        assert_eq!(code(&err), Some("CONFIG-MISSING-PORT"));
        let path = &err.as_configuration().unwrap().path;
        assert_eq!(path, &vec!["assetA".to_string(), "modeling".to_string(), "model".to_string()]);
    }

    #[test]
    fn test_missing_source_workspace() {
        let loader = loader(json!({
            "asset": {
                "workspaces": {
                    "layout": {"ports": {"input": {"model": {"connections": [
                        {"type": "internal", "workspace": "modeling", "port_name": "model"}
                    ]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let asset = build_stage(&loader, &mut tree, "asset", "assetA");

        let err = loader.create_connections(&tree, asset).unwrap_err();
        assert_eq!(code(&err), Some("CONFIG-MISSING-WORKSPACE"));
    }

    #[test]
    fn test_promoted_connection() {
        let loader = loader(json!({
            "shot": {
                "ports": {"input": {"model": {"multi": true}}},
                "workspaces": {
                    "layout": {"ports": {"input": {"model": {"connections": [{"type": "promoted"}]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let shot = build_stage(&loader, &mut tree, "shot", "shotA");

        let connections = loader.create_connections(&tree, shot).unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(tree.port_path(connections[0].source()), "shotA.model");
        assert_eq!(tree.port_path(connections[0].target()), "shotA.layout.model");
        assert!(connections[0].is_internal());
    }

    #[test]
    fn test_missing_promoted_port_names_stage_and_port() {
        let loader = loader(json!({
            "shot": {
                "workspaces": {
                    "layout": {"ports": {"input": {"model": {"connections": [{"type": "promoted"}]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let shot = build_stage(&loader, &mut tree, "shot", "shotA");

        let err = loader.create_connections(&tree, shot).unwrap_err();
        assert_eq!(code(&err), Some("CONFIG-MISSING-PORT"));
        let message = err.to_string();
        assert!(message.contains("shotA"), "{message}");
        assert!(message.contains("'model'"), "{message}");
    }

    #[test]
    fn test_demoted_connection() {
        let loader = loader(json!({
            "asset": {
                "workspaces": {"modeling": {"ports": {"output": {"model": {}}}}},
                "ports": {"output": {"model": {"connections": [
                    {"type": "demoted", "workspace": "modeling"}
                ]}}}
            }
        }));
        let mut tree = Tree::new();
        let asset = build_stage(&loader, &mut tree, "asset", "assetA");

        let connections = loader.create_connections(&tree, asset).unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(tree.port_path(connections[0].source()), "assetA.modeling.model");
        assert_eq!(tree.port_path(connections[0].target()), "assetA.model");
        assert!(connections[0].is_internal());
    }

    #[test]
    fn test_missing_demoted_port() {
        let loader = loader(json!({
            "asset": {
                "workspaces": {"modeling": {}},
                "ports": {"output": {"model": {"connections": [
                    {"type": "demoted", "workspace": "modeling"}
                ]}}}
            }
        }));
        let mut tree = Tree::new();
        let asset = build_stage(&loader, &mut tree, "asset", "assetA");

        let err = loader.create_connections(&tree, asset).unwrap_err();
        assert_eq!(code(&err), Some("CONFIG-MISSING-PORT"));
        assert!(err.to_string().contains("modeling"));
    }

    #[test]
    fn test_workspace_is_not_a_stage() {
        let loader = loader(json!({"asset": {"workspaces": {"modeling": {}}}}));
        let mut tree = Tree::new();
        let asset = build_stage(&loader, &mut tree, "asset", "assetA");
        let modeling = tree.child(asset, "modeling").unwrap();

        let err = loader.create_connections(&tree, modeling).unwrap_err();
        assert_eq!(code(&err), Some("CONFIG-NOT-A-STAGE"));
    }

    #[test]
    fn test_foreach_requires_sequence() {
        let loader = loader(json!({
            "shot": {
                "data": {"assets": {"type": "int", "value": 3}},
                "workspaces": {
                    "layout": {"ports": {"input": {"model": {"multi": true, "connections": [{
                        "type": "external",
                        "port_name": "model",
                        "foreach": {"loop": "stage[assets]"}
                    }]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let shot = build_stage(&loader, &mut tree, "shot", "shotA");

        let err = loader.create_connections(&tree, shot).unwrap_err();
        assert_eq!(code(&err), Some("CONFIG-LOOP-NOT-SEQUENCE"));
    }

    #[test]
    fn test_foreach_item_must_be_node() {
        let loader = loader(json!({
            "shot": {
                "data": {"assets": {"type": "list", "value": ["assetA"]}},
                "workspaces": {
                    "layout": {"ports": {"input": {"model": {"multi": true, "connections": [{
                        "type": "external",
                        "port_name": "model",
                        "foreach": {"loop": "stage[assets]"}
                    }]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let shot = build_stage(&loader, &mut tree, "shot", "shotA");

        let err = loader.create_connections(&tree, shot).unwrap_err();
        assert_eq!(code(&err), Some("CONFIG-ITEM-NOT-NODE"));
    }

    #[test]
    fn test_foreach_fan_out_with_rejection() {
        let loader = loader(json!({
            "asset": {"workspaces": {"modeling": {"ports": {"output": {"model": {}}}}}},
            "shot": {
                "workspaces": {
                    "layout": {"ports": {"input": {"model": {"multi": true, "connections": [{
                        "type": "external",
                        "workspace": "modeling",
                        "port_name": "model",
                        "data": {"tags": {"type": "list", "value": []}},
                        "foreach": {
                            "loop": "stage[instances]",
                            "item": "item.asset",
                            "conditions": [{"type": "boolean", "source": "item.enabled"}],
                            "group": "item.name"
                        }
                    }]}}}}
                }
            }
        }));
        let mut tree = Tree::new();
        let asset_a = build_stage(&loader, &mut tree, "asset", "assetA");
        let asset_b = build_stage(&loader, &mut tree, "asset", "assetB");
        let asset_c = build_stage(&loader, &mut tree, "asset", "assetC");
        let instance = |name: &str, asset: NodeId, enabled: bool| {
            Value::object([
                ("name", Value::from(name)),
                ("asset", Value::Node(asset)),
                ("enabled", Value::Bool(enabled)),
            ])
        };
        let instances = vec![
            instance("assetA_1", asset_a, true),
            instance("assetB_1", asset_b, false),
            instance("assetC_1", asset_c, true),
        ];
        let shot = loader
            .create_stage_node(
                &mut tree,
                "shot",
                "shotA",
                Metadata::new().with_field("instances", "list", instances),
                None,
            )
            .unwrap();

        let mut connections = loader.create_connections(&tree, shot).unwrap();
        assert_eq!(connections.len(), 2);
        let sources: Vec<String> = connections.iter().map(|c| tree.port_path(c.source())).collect();
        assert_eq!(sources, vec!["assetA.modeling.model", "assetC.modeling.model"]);
        assert!(connections.iter().all(|c| !c.is_internal()));
        assert_eq!(connections[0].group, Some(Value::from("assetA_1")));

        if let Some(Value::List(tags)) = connections[0].metadata.value_mut("tags") {
            tags.push(Value::from("mutated"));
        }
        assert_eq!(
            connections[0].metadata.value("tags"),
            Some(&Value::List(vec![Value::from("mutated")]))
        );
        assert_eq!(connections[1].metadata.value("tags"), Some(&Value::List(vec![])));
    }
}
