// src/runner/dry_run.rs

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ArtifactKind;
use crate::errors::{CacheError, RunnerError};
use crate::runner::drive::{Execution, OutputSlot, drive_node};
use crate::runner::status::StatusSink;
use crate::runner::{RunContext, RunFuture, Runner};

/// Prepares a node without computing it.
///
/// Key derivation already fails on missing input files; on top of that the
/// dry run checks the node has a command, creates the output directory and
/// records a `prepared` artifact. Upstream nodes that were never prepared
/// are reported but do not fail the node.
#[derive(Debug)]
pub struct DryRunRunner {
    status: StatusSink,
    // Never cancelled: there is nothing external to kill.
    cancel: CancellationToken,
}

impl DryRunRunner {
    pub fn new(status: StatusSink) -> Self {
        Self {
            status,
            cancel: CancellationToken::new(),
        }
    }

    fn prepare(
        &self,
        ctx: RunContext<'_>,
        node: &str,
        slot: &OutputSlot,
    ) -> Result<Execution, RunnerError> {
        let spec = ctx
            .graph
            .node(node)
            .ok_or_else(|| CacheError::UnknownNode(node.to_string()))?;

        if spec.cmd.trim().is_empty() {
            return Err(RunnerError::Validation {
                node: node.to_string(),
                reason: "empty command".to_string(),
            });
        }

        for dep in spec.deps.iter() {
            let dep_key = ctx.cache.key_for(ctx.graph, ctx.environment, dep)?;
            if !ctx.cache.contains(dep, &dep_key, ArtifactKind::Prepared)? {
                warn!(node, upstream = %dep, "upstream node has not been prepared");
            }
        }

        info!(node, output_dir = ?slot.output_dir, "prepared node output location");
        Ok(Execution::Finished)
    }
}

impl Runner for DryRunRunner {
    fn run<'a>(&'a self, ctx: RunContext<'a>, node: &'a str) -> RunFuture<'a> {
        Box::pin(drive_node(
            ctx,
            node,
            &self.status,
            &self.cancel,
            ArtifactKind::Prepared,
            move |slot| async move { self.prepare(ctx, node, &slot) },
        ))
    }

    fn kill(&self) {
        debug!("dry-run runner has nothing to kill");
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
