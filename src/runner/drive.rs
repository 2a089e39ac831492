// src/runner/drive.rs

//! Cache protocol shared by every runner variant.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::{Artifact, ArtifactKind};
use crate::errors::{CacheError, RunnerError};
use crate::runner::status::StatusSink;
use crate::runner::{NodeOutcome, RunContext};
use crate::types::NodeStatus;

/// Where a cache miss should put its results.
#[derive(Debug, Clone)]
pub struct OutputSlot {
    pub key: String,
    pub output_dir: PathBuf,
}

/// How the variant-specific step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Finished,
    Cancelled,
}

/// Run one node through the cache protocol:
///
/// 1. report `Running`,
/// 2. derive the key and return `Cached` if a satisfying artifact exists,
/// 3. otherwise prepare the output directory and call `execute`,
/// 4. on success store an artifact of kind `produces`.
///
/// The terminal status (`Done`, `Error` or `Cancelled`) is reported before
/// returning. A runner whose `cancel` token already fired returns
/// `Cancelled` without touching the cache.
pub async fn drive_node<F, Fut>(
    ctx: RunContext<'_>,
    node: &str,
    status: &StatusSink,
    cancel: &CancellationToken,
    produces: ArtifactKind,
    execute: F,
) -> Result<NodeOutcome, RunnerError>
where
    F: FnOnce(OutputSlot) -> Fut,
    Fut: Future<Output = Result<Execution, RunnerError>>,
{
    if cancel.is_cancelled() {
        info!(node, "runner already killed; not starting node");
        status.emit(node, NodeStatus::Cancelled);
        return Ok(NodeOutcome::Cancelled);
    }

    status.emit(node, NodeStatus::Running);

    let result = drive_inner(ctx, node, produces, execute).await;
    match &result {
        Ok(NodeOutcome::Computed) | Ok(NodeOutcome::Cached) => {
            status.emit(node, NodeStatus::Done);
        }
        Ok(NodeOutcome::Cancelled) => status.emit(node, NodeStatus::Cancelled),
        Err(e) => {
            warn!(node, error = %e, "node computation failed");
            status.emit(node, NodeStatus::Error);
        }
    }
    result
}

async fn drive_inner<F, Fut>(
    ctx: RunContext<'_>,
    node: &str,
    produces: ArtifactKind,
    execute: F,
) -> Result<NodeOutcome, RunnerError>
where
    F: FnOnce(OutputSlot) -> Fut,
    Fut: Future<Output = Result<Execution, RunnerError>>,
{
    let key = ctx.cache.key_for(ctx.graph, ctx.environment, node)?;

    if ctx.cache.contains(node, &key, produces)? {
        info!(node, key = %key, "cache hit; skipping computation");
        return Ok(NodeOutcome::Cached);
    }

    let output_dir = ctx.cache.prepare_output_dir(node, &key)?;
    let slot = OutputSlot {
        key: key.clone(),
        output_dir,
    };

    match execute(slot).await? {
        Execution::Finished => {
            ctx.cache.store(&Artifact {
                node: node.to_string(),
                key,
                kind: produces,
            })?;
            Ok(NodeOutcome::Computed)
        }
        Execution::Cancelled => Ok(NodeOutcome::Cancelled),
    }
}

/// Variables describing a node's computation, on top of the environment's
/// own vars:
///
/// - `DAG_NODE`, `DAG_OUTPUT_DIR`, `DAG_CACHE_ROOT`
/// - `DAG_INPUT_<DEP>`: output directory of each dependency
/// - `DAG_PARAM_<NAME>`: each node parameter
pub fn node_env(
    ctx: RunContext<'_>,
    node: &str,
    slot: &OutputSlot,
) -> Result<BTreeMap<String, String>, RunnerError> {
    let spec = ctx
        .graph
        .node(node)
        .ok_or_else(|| CacheError::UnknownNode(node.to_string()))?;

    let mut vars = ctx.environment.vars().clone();
    vars.insert("DAG_NODE".to_string(), node.to_string());
    vars.insert(
        "DAG_OUTPUT_DIR".to_string(),
        slot.output_dir.display().to_string(),
    );
    vars.insert(
        "DAG_CACHE_ROOT".to_string(),
        ctx.cache.root().display().to_string(),
    );

    for dep in spec.deps.iter() {
        let dep_key = ctx.cache.key_for(ctx.graph, ctx.environment, dep)?;
        vars.insert(
            format!("DAG_INPUT_{}", env_suffix(dep)),
            ctx.cache.output_dir(dep, &dep_key).display().to_string(),
        );
    }

    for (name, value) in spec.params.iter() {
        vars.insert(format!("DAG_PARAM_{}", env_suffix(name)), value.clone());
    }

    Ok(vars)
}

/// Upper-case a name and map anything but ASCII alphanumerics to `_`.
pub fn env_suffix(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
