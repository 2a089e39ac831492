// tests/graph_leaves.rs

use std::collections::BTreeSet;

use proptest::prelude::*;

use dagworker::config::PipelineFile;
use dagworker::graph::Graph;
use dagworker::worker::resolve_start_nodes;
use dagworker_test_utils::builders::{NodeBuilder, PipelineBuilder};

/// CameraInit -> FeatureExtraction -> {Meshing, Report}
fn branching_graph() -> Graph {
    PipelineBuilder::new()
        .with_node("CameraInit", NodeBuilder::new("echo init").build())
        .with_node(
            "FeatureExtraction",
            NodeBuilder::new("echo fe").after("CameraInit").build(),
        )
        .with_node(
            "Meshing",
            NodeBuilder::new("echo mesh").after("FeatureExtraction").build(),
        )
        .with_node(
            "Report",
            NodeBuilder::new("echo report").after("FeatureExtraction").build(),
        )
        .build_graph()
}

#[test]
fn leaves_are_nodes_without_dependents() {
    let graph = branching_graph();
    let leaves: Vec<&str> = graph.leaves().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(leaves, vec!["Meshing", "Report"]);

    assert_eq!(graph.dependencies_of("Meshing"), ["FeatureExtraction".to_string()]);
    let mut dependents = graph.dependents_of("FeatureExtraction").to_vec();
    dependents.sort();
    assert_eq!(dependents, vec!["Meshing".to_string(), "Report".to_string()]);
    assert!(graph.dependents_of("Unknown").is_empty());
}

#[test]
fn start_node_resolution() {
    let graph = branching_graph();

    assert_eq!(resolve_start_nodes(&graph, None), vec!["Meshing", "Report"]);
    // An empty name means "no start node".
    assert_eq!(resolve_start_nodes(&graph, Some("")), vec!["Meshing", "Report"]);
    // A named node is used as-is, even when it is not a leaf.
    assert_eq!(resolve_start_nodes(&graph, Some("CameraInit")), vec!["CameraInit"]);
}

// Acyclic by construction: node i may only depend on nodes 0..i.
fn pipeline_strategy(max_nodes: usize) -> impl Strategy<Value = PipelineFile> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_nodes),
            num_nodes,
        )
        .prop_map(move |raw_deps| {
            let mut builder = PipelineBuilder::new();
            for (i, potential) in raw_deps.into_iter().enumerate() {
                let name = format!("node_{}", i);
                let mut node = NodeBuilder::new(&format!("echo {}", name));
                let deps: BTreeSet<usize> = if i == 0 {
                    BTreeSet::new()
                } else {
                    potential.into_iter().map(|d| d % i).collect()
                };
                for dep in deps {
                    node = node.after(&format!("node_{}", dep));
                }
                builder = builder.with_node(&name, node.build());
            }
            builder.build()
        })
    })
}

proptest! {
    #[test]
    fn default_resolution_equals_leaf_set(cfg in pipeline_strategy(12)) {
        let graph = Graph::from_pipeline(&cfg);

        let resolved: BTreeSet<String> = resolve_start_nodes(&graph, None).into_iter().collect();
        let expected: BTreeSet<String> = cfg
            .node
            .keys()
            .filter(|name| !cfg.node.values().any(|n| n.after.contains(name)))
            .cloned()
            .collect();

        prop_assert_eq!(&resolved, &expected);
        // A non-empty acyclic graph always has at least one leaf.
        prop_assert!(!resolved.is_empty());
    }

    #[test]
    fn named_start_resolves_to_exactly_that_node(cfg in pipeline_strategy(8), pick in any::<usize>()) {
        let graph = Graph::from_pipeline(&cfg);
        let names: Vec<String> = graph.nodes().map(|n| n.name.clone()).collect();
        let start = &names[pick % names.len()];

        prop_assert_eq!(resolve_start_nodes(&graph, Some(start.as_str())), vec![start.clone()]);
    }
}
