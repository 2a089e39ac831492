// src/graph/graph.rs

use std::collections::BTreeMap;

use crate::config::PipelineFile;
use crate::graph::node::{Node, NodeName};

/// Internal entry: the node itself plus its reverse edges.
#[derive(Debug, Clone)]
struct GraphEntry {
    node: Node,
    /// Nodes that list this one in their `after`.
    dependents: Vec<NodeName>,
}

/// In-memory pipeline graph keyed by node name.
///
/// Acyclicity is checked when the pipeline file is validated, so this type
/// only keeps adjacency. Iteration order is lexicographic by node name.
#[derive(Debug, Clone)]
pub struct Graph {
    entries: BTreeMap<NodeName, GraphEntry>,
}

impl Graph {
    /// Build a graph from a validated [`PipelineFile`].
    pub fn from_pipeline(cfg: &PipelineFile) -> Self {
        let mut entries: BTreeMap<NodeName, GraphEntry> = cfg
            .node
            .iter()
            .map(|(name, node_cfg)| {
                (
                    name.clone(),
                    GraphEntry {
                        node: Node::from_config(name.clone(), node_cfg),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for (name, node_cfg) in cfg.node.iter() {
            for dep in node_cfg.after.iter() {
                if let Some(entry) = entries.get_mut(dep) {
                    entry.dependents.push(name.clone());
                }
            }
        }

        Self { entries }
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.entries.get(name).map(|e| &e.node)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.entries.values().map(|e| &e.node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nodes that nothing depends on: the natural end points of the pipeline.
    pub fn leaves(&self) -> Vec<&Node> {
        self.entries
            .values()
            .filter(|e| e.dependents.is_empty())
            .map(|e| &e.node)
            .collect()
    }

    /// Immediate dependencies of a node.
    pub fn dependencies_of(&self, name: &str) -> &[NodeName] {
        self.entries
            .get(name)
            .map(|e| e.node.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a node.
    pub fn dependents_of(&self, name: &str) -> &[NodeName] {
        self.entries
            .get(name)
            .map(|e| e.dependents.as_slice())
            .unwrap_or(&[])
    }
}
