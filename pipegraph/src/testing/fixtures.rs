//! Shared production template and a fixture that builds it.

use crate::config::GraphConfig;
use crate::errors::PipegraphError;
use crate::expression::Value;
use crate::graph::Graph;
use crate::loader::ConfigLoader;
use crate::model::{Metadata, NodeId, Tree};
use serde_json::json;

/// A project/asset/shot template exercising every connection type,
/// conditional workspaces and port promotion.
#[must_use]
pub fn production_config() -> serde_json::Value {
    json!({
        "stages": {
            "project": {
                "data": {
                    "hero_shots": {"type": "list", "value": ["shotA"]}
                },
                "workspaces": {
                    "editorial": {"ports": {"output": {"edit": {}}}}
                }
            },
            "asset": {
                "data": {
                    "is_rigged": {"type": "bool", "value": false}
                },
                "workspaces": {
                    "modeling": {
                        "ports": {
                            "output": {
                                "model": {"promote": true},
                                "blendshape": {}
                            }
                        }
                    },
                    "surfacing": {
                        "ports": {
                            "input": {
                                "model": {
                                    "connections": [
                                        {"type": "internal", "workspace": "modeling", "port_name": "model"}
                                    ]
                                }
                            },
                            "output": {"model": {"promote": true}}
                        }
                    }
                },
                "conditional": [{
                    "conditions": [{"type": "boolean", "source": "stage[is_rigged]"}],
                    "workspaces": {
                        "rigging": {
                            "ports": {
                                "input": {
                                    "model": {
                                        "connections": [
                                            {"type": "internal", "workspace": "modeling", "port_name": "model"}
                                        ]
                                    }
                                },
                                "output": {"rig": {"promote": true}}
                            }
                        }
                    }
                }]
            },
            "shot": {
                "data": {
                    "animated_instances": {"type": "list", "value": []},
                    "static_instances": {"type": "list", "value": []}
                },
                "workspaces": {
                    "layout": {
                        "ports": {
                            "input": {
                                "model": {
                                    "multi": true,
                                    "data": {"lod": {"type": "str", "value": "proxy"}},
                                    "connections": [{
                                        "type": "external",
                                        "port_name": "model",
                                        "data": {"lod": {"type": "str", "value": "proxy"}},
                                        "foreach": {
                                            "loop": "stage[animated_instances]",
                                            "item": "item.asset",
                                            "group": "item.name"
                                        }
                                    }]
                                }
                            },
                            "output": {"scene": {}}
                        }
                    },
                    "animation": {
                        "ports": {
                            "input": {
                                "scene": {
                                    "connections": [
                                        {"type": "internal", "workspace": "layout", "port_name": "scene"}
                                    ]
                                },
                                "rig": {
                                    "connections": [{
                                        "type": "external",
                                        "workspace": "rigging",
                                        "port_name": "rig",
                                        "foreach": {
                                            "loop": "stage[animated_instances]",
                                            "item": "item.asset",
                                            "conditions": [
                                                {"type": "boolean", "source": "item.asset[is_rigged]"}
                                            ]
                                        }
                                    }]
                                }
                            }
                        }
                    }
                },
                "ports": {
                    "input": {
                        "assets": {
                            "multi": true,
                            "connections": [{
                                "type": "external",
                                "port_name": "model",
                                "foreach": {"loop": "stage[static_instances]", "item": "item.asset"}
                            }]
                        }
                    },
                    "output": {
                        "scene": {
                            "connections": [
                                {"type": "demoted", "workspace": "layout", "group": "source.node.name"}
                            ]
                        }
                    }
                },
                "conditional": [{
                    "conditions": [{
                        "type": "comparison",
                        "source": "stage.name",
                        "target": "stage.parent[hero_shots]",
                        "comparison": "in"
                    }],
                    "workspaces": {
                        "lighting": {
                            "ports": {
                                "input": {
                                    "assets": {
                                        "connections": [{"type": "promoted"}]
                                    }
                                }
                            }
                        }
                    }
                }]
            }
        }
    })
}

/// An animated or static placement of an asset in a shot.
#[must_use]
pub fn instance(name: &str, asset: NodeId) -> Value {
    Value::object([("name", Value::from(name)), ("asset", Value::Node(asset))])
}

/// A built pipeline: `pipeline > project > {assetA, assetB, shotA}`.
///
/// `assetB` is rigged; `shotA` animates `assetA_1`, `assetB_1` and
/// `assetB_2` and holds `assetA_static` as a static instance.
#[derive(Debug)]
pub struct PipelineFixture {
    /// The loader over [`production_config`].
    pub loader: ConfigLoader,
    /// The built tree.
    pub tree: Tree,
    /// The `pipeline` root.
    pub root: NodeId,
    /// The project stage.
    pub project: NodeId,
    /// Unrigged asset.
    pub asset_a: NodeId,
    /// Rigged asset.
    pub asset_b: NodeId,
    /// The shot.
    pub shot: NodeId,
}

impl PipelineFixture {
    /// Builds the structure of every stage. Connections are not resolved.
    ///
    /// # Errors
    ///
    /// Propagates configuration and expression errors.
    pub fn build() -> Result<Self, PipegraphError> {
        let loader = ConfigLoader::new(GraphConfig::from_value(production_config())?);
        let mut tree = Tree::new();

        let root = tree.add_node("root", "pipeline", Metadata::new(), None)?;
        let project =
            loader.create_stage_node(&mut tree, "project", "project", Metadata::new(), Some(root))?;
        let asset_a =
            loader.create_stage_node(&mut tree, "asset", "assetA", Metadata::new(), Some(project))?;
        let asset_b = loader.create_stage_node(
            &mut tree,
            "asset",
            "assetB",
            Metadata::new().with_field("is_rigged", "bool", true),
            Some(project),
        )?;
        let shot = loader.create_stage_node(
            &mut tree,
            "shot",
            "shotA",
            Metadata::new()
                .with_field(
                    "animated_instances",
                    "list",
                    vec![
                        instance("assetA_1", asset_a),
                        instance("assetB_1", asset_b),
                        instance("assetB_2", asset_b),
                    ],
                )
                .with_field("static_instances", "list", vec![instance("assetA_static", asset_a)]),
            Some(project),
        )?;

        Ok(Self {
            loader,
            tree,
            root,
            project,
            asset_a,
            asset_b,
            shot,
        })
    }

    /// Returns the stages in dependency order.
    #[must_use]
    pub fn stages(&self) -> [NodeId; 4] {
        [self.project, self.asset_a, self.asset_b, self.shot]
    }

    /// Registers the root and every stage into a new graph.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors and arity violations.
    pub fn graph(&self) -> Result<Graph<'_>, PipegraphError> {
        let mut graph = Graph::new(&self.tree);
        graph.add_node(self.root);
        for stage in self.stages() {
            graph.register_stage(&self.loader, stage)?;
        }
        Ok(graph)
    }
}
