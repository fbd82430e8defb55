//! Materializes stage, workspace and port structure.

use super::cascade::{port_entries, workspace_entries, PortEntry};
use super::ConfigLoader;
use crate::errors::{ConfigurationError, PipegraphError};
use crate::expression::Keywords;
use crate::model::{Metadata, NodeId, Port, PortId, Tree, WORKSPACE_KIND};
use tracing::{debug, info, warn};

impl ConfigLoader {
    /// Creates a stage node with its workspaces and ports under `parent`.
    ///
    /// `data` overrides the template's default metadata at the top level.
    /// Workspace ports flagged `promote` are merged into promoted ports on
    /// the stage. Connections are not created; see
    /// [`ConfigLoader::create_connections`].
    ///
    /// On error every node and port created by the call is removed again,
    /// so `tree` and `parent` are left as they were.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind is unknown, a condition fails to
    /// evaluate, or a promoted port collides with a plain stage port.
    pub fn create_stage_node(
        &self,
        tree: &mut Tree,
        kind: &str,
        name: &str,
        data: Metadata,
        parent: Option<NodeId>,
    ) -> Result<NodeId, PipegraphError> {
        let checkpoint = tree.checkpoint();
        self.build_stage(tree, kind, name, data, parent)
            .inspect_err(|err| {
                warn!(stage = %name, kind = %kind, error = %err, "Discarding partially built stage");
                tree.rollback(checkpoint);
            })
    }

    fn build_stage(
        &self,
        tree: &mut Tree,
        kind: &str,
        name: &str,
        data: Metadata,
        parent: Option<NodeId>,
    ) -> Result<NodeId, PipegraphError> {
        let template = self.config().stage(kind)?;
        let metadata = Metadata::from_json(&template.data).merged(data);
        let stage = tree.add_node(kind, name, metadata, parent)?;
        debug!(stage = %name, kind = %kind, "Created stage node");

        let workspaces = {
            let keywords = Keywords::with_tree(tree).with("stage", stage);
            workspace_entries(&template.body, &keywords)?
        };

        let mut promoted = 0;
        for (workspace_name, workspace_template) in workspaces {
            let workspace = tree.add_node(
                WORKSPACE_KIND,
                workspace_name,
                Metadata::from_json(&workspace_template.data),
                Some(stage),
            )?;
            debug!(stage = %name, workspace = %workspace_name, "Created workspace");

            let entries = {
                let keywords = Keywords::with_tree(tree)
                    .with("stage", stage)
                    .with("workspace", workspace);
                port_entries(&workspace_template.body, &keywords)?
            };

            for entry in entries {
                let port = attach_port(tree, workspace, entry)?;
                if entry.template.promote {
                    promote(tree, stage, port)?;
                    promoted += 1;
                }
            }
        }

        let entries = {
            let keywords = Keywords::with_tree(tree).with("stage", stage);
            port_entries(&template.body, &keywords)?
        };
        for entry in entries {
            if let Some(existing) = tree.find_port(stage, entry.direction, entry.name) {
                if tree.port(existing).is_promoted_port() {
                    return Err(ConfigurationError::coded(
                        "CONFIG-PROMOTION-CONFLICT",
                        format!(
                            "Stage port '{}' ({}) collides with a promoted port",
                            entry.name, entry.direction
                        ),
                    )
                    .with_path(tree.port_segments(existing))
                    .into());
                }
            }
            attach_port(tree, stage, entry)?;
        }

        info!(
            stage = %name,
            kind = %kind,
            workspaces = tree.children(stage).len(),
            ports = tree.ports(stage).len(),
            promoted,
            "Stage materialized"
        );
        Ok(stage)
    }
}

fn attach_port(
    tree: &mut Tree,
    node: NodeId,
    entry: PortEntry<'_>,
) -> Result<PortId, ConfigurationError> {
    let port = Port::new(entry.direction, entry.name)
        .with_multi(entry.template.multi)
        .with_promote(entry.template.promote)
        .with_metadata(Metadata::from_json(&entry.template.data));
    let id = tree.add_port(node, port)?;
    debug!(port = %tree.port_path(id), direction = %entry.direction, "Attached port");
    Ok(id)
}

/// Adds `member` to the stage's promoted port of the same direction and
/// name, creating that port on first use.
fn promote(tree: &mut Tree, stage: NodeId, member: PortId) -> Result<(), ConfigurationError> {
    let (direction, name, multi) = {
        let port = tree.port(member);
        (port.direction(), port.name().to_string(), port.is_multi())
    };

    let promoted = match tree.find_port(stage, direction, &name) {
        Some(existing) => existing,
        None => {
            let id = tree.add_port(stage, Port::promoted_port(direction, &name, multi))?;
            debug!(port = %tree.port_path(id), "Created promoted port");
            id
        }
    };
    tree.share(promoted, member)?;
    debug!(
        port = %tree.port_path(promoted),
        member = %tree.port_path(member),
        shared = tree.port(promoted).shared().len(),
        "Extended promoted port"
    );
    Ok(())
}
