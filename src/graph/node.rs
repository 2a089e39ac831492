// src/graph/node.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::NodeConfig;

/// Unique, stable node identifier.
pub type NodeName = String;

/// One unit of computation in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: NodeName,
    pub cmd: String,
    /// Input files, possibly relative to the environment's working directory.
    pub inputs: Vec<PathBuf>,
    pub params: BTreeMap<String, String>,
    /// Direct upstream nodes (`after = [...]`).
    pub deps: Vec<NodeName>,
}

impl Node {
    pub fn from_config(name: NodeName, cfg: &NodeConfig) -> Self {
        Self {
            name,
            cmd: cfg.cmd.clone(),
            inputs: cfg.inputs.clone(),
            params: cfg.params.clone(),
            deps: cfg.after.clone(),
        }
    }
}
