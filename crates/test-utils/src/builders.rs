#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use dagworker::config::{
    ConfigSection, EnvironmentSection, NodeConfig, PipelineFile, RawPipelineFile,
};
use dagworker::graph::Graph;

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineBuilder {
    raw: RawPipelineFile,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawPipelineFile {
                config: ConfigSection::default(),
                environment: EnvironmentSection::default(),
                remote: None,
                node: BTreeMap::new(),
            },
        }
    }

    pub fn with_node(mut self, name: &str, node: NodeConfig) -> Self {
        self.raw.node.insert(name.to_string(), node);
        self
    }

    pub fn with_cache(mut self, location: &str) -> Self {
        self.raw.config.cache = Some(location.to_string());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.environment.working_dir = Some(dir.into());
        self
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.raw
            .environment
            .vars
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn raw(self) -> RawPipelineFile {
        self.raw
    }

    pub fn build(self) -> PipelineFile {
        PipelineFile::try_from(self.raw).expect("Failed to build valid pipeline from builder")
    }

    pub fn build_graph(self) -> Graph {
        Graph::from_pipeline(&self.build())
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NodeConfig`.
pub struct NodeBuilder {
    node: NodeConfig,
}

impl NodeBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            node: NodeConfig {
                cmd: cmd.to_string(),
                after: vec![],
                inputs: vec![],
                params: BTreeMap::new(),
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.node.after.push(dep.to_string());
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.node.inputs.push(path.into());
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.node.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> NodeConfig {
        self.node
    }
}
