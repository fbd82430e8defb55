//! End-to-end builds of the production template.

#[cfg(test)]
mod tests {
    use crate::errors::PipegraphError;
    use crate::expression::Value;
    use crate::graph::Graph;
    use crate::loader::ConfigLoader;
    use crate::model::{Direction, Metadata, NodeId, Tree};
    use crate::testing::{
        assert_connection, assert_port_paths, connection_paths, instance, PipelineFixture,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_structure() {
        init_tracing();
        let f = PipelineFixture::build().unwrap();
        let tree = &f.tree;

        let workspaces = |stage: NodeId| {
            tree.children(stage)
                .iter()
                .map(|c| tree.node(*c).name())
                .collect::<Vec<_>>()
        };
        assert_eq!(workspaces(f.asset_a), vec!["modeling", "surfacing"]);
        assert_eq!(workspaces(f.asset_b), vec!["modeling", "surfacing", "rigging"]);
        assert_eq!(workspaces(f.shot), vec!["layout", "animation", "lighting"]);

        assert_port_paths(
            tree,
            tree.ports(f.asset_b),
            &[
                "pipeline.project.assetB.model",
                "pipeline.project.assetB.rig",
            ],
        );
        let model = tree.find_port(f.asset_b, Direction::Output, "model").unwrap();
        assert_port_paths(
            tree,
            tree.port(model).shared(),
            &[
                "pipeline.project.assetB.modeling.model",
                "pipeline.project.assetB.surfacing.model",
            ],
        );

        assert_port_paths(
            tree,
            tree.ports(f.shot),
            &["pipeline.project.shotA.assets", "pipeline.project.shotA.scene"],
        );
    }

    #[test]
    fn test_asset_connections() {
        init_tracing();
        let f = PipelineFixture::build().unwrap();

        let a = f.loader.create_connections(&f.tree, f.asset_a).unwrap();
        assert_eq!(a.len(), 1);
        assert_connection(
            &f.tree,
            &a[0],
            "pipeline.project.assetA.modeling.model",
            "pipeline.project.assetA.surfacing.model",
        );

        let b = f.loader.create_connections(&f.tree, f.asset_b).unwrap();
        assert_eq!(
            connection_paths(&f.tree, &b),
            vec![
                "pipeline.project.assetB.modeling.model -> pipeline.project.assetB.surfacing.model",
                "pipeline.project.assetB.modeling.model -> pipeline.project.assetB.rigging.model",
            ]
        );
        assert!(b.iter().all(|c| c.is_internal()));
    }

    #[test]
    fn test_shot_connections() {
        init_tracing();
        let f = PipelineFixture::build().unwrap();
        let connections = f.loader.create_connections(&f.tree, f.shot).unwrap();

        assert_eq!(
            connection_paths(&f.tree, &connections),
            vec![
                "pipeline.project.assetA.model -> pipeline.project.shotA.layout.model",
                "pipeline.project.assetB.model -> pipeline.project.shotA.layout.model",
                "pipeline.project.assetB.model -> pipeline.project.shotA.layout.model",
                "pipeline.project.shotA.layout.scene -> pipeline.project.shotA.animation.scene",
                "pipeline.project.assetB.rigging.rig -> pipeline.project.shotA.animation.rig",
                "pipeline.project.assetB.rigging.rig -> pipeline.project.shotA.animation.rig",
                "pipeline.project.shotA.assets -> pipeline.project.shotA.lighting.assets",
                "pipeline.project.assetA.model -> pipeline.project.shotA.assets",
                "pipeline.project.shotA.layout.scene -> pipeline.project.shotA.scene",
            ]
        );

        let groups: Vec<Option<Value>> = connections[..3].iter().map(|c| c.group.clone()).collect();
        assert_eq!(
            groups,
            vec![
                Some(Value::from("assetA_1")),
                Some(Value::from("assetB_1")),
                Some(Value::from("assetB_2")),
            ]
        );
        assert!(connections[..3].iter().all(|c| !c.is_internal()));
        assert_eq!(connections[0].metadata.value("lod"), Some(&Value::from("proxy")));
        assert_eq!(connections[8].group, Some(Value::from("layout")));
    }

    #[test]
    fn test_foreach_metadata_is_not_shared() {
        let f = PipelineFixture::build().unwrap();
        let mut connections = f.loader.create_connections(&f.tree, f.shot).unwrap();

        if let Some(value) = connections[0].metadata.value_mut("lod") {
            *value = Value::from("render");
        }
        assert_eq!(connections[0].metadata.value("lod"), Some(&Value::from("render")));
        assert_eq!(connections[1].metadata.value("lod"), Some(&Value::from("proxy")));
    }

    #[test]
    fn test_graph_deduplicates() {
        init_tracing();
        let f = PipelineFixture::build().unwrap();
        let graph = f.graph().unwrap();

        // assetA: 1, assetB: 2, shotA: 9 resolved of which 2 repeat a pair.
        assert_eq!(graph.connection_count(), 10);

        let layout_model = f
            .tree
            .find_port(f.tree.child(f.shot, "layout").unwrap(), Direction::Input, "model")
            .unwrap();
        let sources: Vec<String> = graph
            .connected(layout_model)
            .map(|p| f.tree.port_path(p))
            .collect();
        assert_eq!(
            sources,
            vec!["pipeline.project.assetA.model", "pipeline.project.assetB.model"]
        );

        assert_eq!(graph.node("shotA", None), Some(f.shot));
        assert_eq!(graph.node("assetB", Some("asset")), Some(f.asset_b));
        assert_eq!(graph.node("assetB", Some("shot")), None);
        // Workspaces share `(kind, name)` identity across stages.
        let modeling = graph.node("modeling", Some("workspace")).unwrap();
        assert_eq!(f.tree.node_path(modeling), "pipeline.project.assetA.modeling");
    }

    #[test]
    fn test_graph_rejects_second_connection_to_single_input() {
        let loader = ConfigLoader::from_value(json!({
            "stages": {
                "asset": {"workspaces": {"modeling": {"ports": {"output": {"model": {}}}}}},
                "shot": {
                    "data": {"assets": {"type": "list", "value": []}},
                    "workspaces": {
                        "layout": {"ports": {"input": {"model": {"connections": [{
                            "type": "external",
                            "workspace": "modeling",
                            "port_name": "model",
                            "foreach": {"loop": "stage[assets]", "item": "item.asset"}
                        }]}}}}
                    }
                }
            }
        }))
        .unwrap();

        let mut tree = Tree::new();
        let a = loader
            .create_stage_node(&mut tree, "asset", "assetA", Metadata::new(), None)
            .unwrap();
        let b = loader
            .create_stage_node(&mut tree, "asset", "assetB", Metadata::new(), None)
            .unwrap();
        let shot = loader
            .create_stage_node(
                &mut tree,
                "shot",
                "shotA",
                Metadata::new().with_field(
                    "assets",
                    "list",
                    vec![instance("a", a), instance("b", b)],
                ),
                None,
            )
            .unwrap();

        let mut graph = Graph::new(&tree);
        let err = match graph.register_stage(&loader, shot).unwrap_err() {
            PipegraphError::Arity(err) => err,
            other => panic!("expected arity error, got {other}"),
        };
        assert_eq!(err.port, "shotA.layout.model");
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_missing_hero_list_is_missing_data() {
        let f = PipelineFixture::build().unwrap();
        let mut tree = Tree::new();
        let err = f
            .loader
            .create_stage_node(&mut tree, "shot", "orphan", Metadata::new(), None)
            .unwrap_err();
        // `stage.parent` is null for an unattached shot.
        assert!(err.as_expression().is_some_and(|e| e.is_missing_data()));
    }
}
