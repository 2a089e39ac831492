// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::duration::parse_duration;
use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::{DagworkerError, Result};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = DagworkerError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_pipeline(&raw)?;
        Ok(PipelineFile::new_unchecked(raw))
    }
}

fn validate_raw_pipeline(cfg: &RawPipelineFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    validate_node_names(cfg)?;
    validate_remote(cfg)?;
    validate_node_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(DagworkerError::ConfigError(
            "pipeline must contain at least one [node.<name>] section".to_string(),
        ));
    }
    Ok(())
}

/// Node names become directory names inside the cache, so keep them to a
/// conservative character set.
fn validate_node_names(cfg: &RawPipelineFile) -> Result<()> {
    for name in cfg.node.keys() {
        let usable = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !usable {
            return Err(DagworkerError::ConfigError(format!(
                "invalid node name '{}': use only letters, digits, '_', '-' and '.'",
                name
            )));
        }
    }
    Ok(())
}

fn validate_remote(cfg: &RawPipelineFile) -> Result<()> {
    if let Some(remote) = &cfg.remote {
        if let Some(interval) = &remote.poll_interval {
            let parsed = parse_duration(interval).map_err(|e| {
                DagworkerError::ConfigError(format!("[remote].poll_interval: {e}"))
            })?;
            if parsed.is_zero() {
                return Err(DagworkerError::ConfigError(
                    "[remote].poll_interval must be greater than zero".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn validate_node_dependencies(cfg: &RawPipelineFile) -> Result<()> {
    for (name, node) in cfg.node.iter() {
        for dep in node.after.iter() {
            if dep == name {
                return Err(DagworkerError::ConfigError(format!(
                    "node '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.node.contains_key(dep) {
                return Err(DagworkerError::ConfigError(format!(
                    "node '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawPipelineFile) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.node.keys() {
        graph.add_node(name.as_str());
    }

    for (name, node) in cfg.node.iter() {
        for dep in node.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DagworkerError::DagCycle(format!(
            "cycle detected in pipeline graph involving node '{}'",
            cycle.node_id()
        ))),
    }
}
