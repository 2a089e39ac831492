// src/runner/remote.rs

//! Offloads each node to a farm job queue.
//!
//! `run` blocks until the submitted job reaches a terminal state, so the
//! artifact is only written once the farm reports success, and status
//! callbacks see `Done` at the same point in time as with a local run.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ArtifactKind;
use crate::errors::{CacheError, RunnerError};
use crate::queue::{JobQueue, JobSpec, JobState};
use crate::runner::drive::{Execution, OutputSlot, drive_node, node_env};
use crate::runner::status::StatusSink;
use crate::runner::{RunContext, RunFuture, Runner};

#[derive(Debug)]
pub struct RemoteRunner {
    status: StatusSink,
    cancel: CancellationToken,
    queue: Arc<dyn JobQueue>,
    poll_interval: Duration,
}

impl RemoteRunner {
    pub fn new(status: StatusSink, queue: Arc<dyn JobQueue>, poll_interval: Duration) -> Self {
        Self {
            status,
            cancel: CancellationToken::new(),
            queue,
            poll_interval,
        }
    }

    async fn submit_and_wait(
        &self,
        ctx: RunContext<'_>,
        node: &str,
        slot: OutputSlot,
    ) -> Result<Execution, RunnerError> {
        let spec = ctx
            .graph
            .node(node)
            .ok_or_else(|| CacheError::UnknownNode(node.to_string()))?;

        let job = JobSpec {
            node: node.to_string(),
            key: slot.key.clone(),
            cmd: spec.cmd.clone(),
            env: node_env(ctx, node, &slot)?,
            output_dir: slot.output_dir,
            cache_root: ctx.cache.root().to_path_buf(),
            working_dir: ctx.environment.working_dir().map(|d| d.to_path_buf()),
        };

        let id = self.queue.submit(&job)?;
        info!(node, job = %id, "remote job submitted");

        loop {
            match self.queue.poll(&id)? {
                JobState::Succeeded => {
                    info!(node, job = %id, "remote job succeeded");
                    return Ok(Execution::Finished);
                }
                JobState::Failed(reason) => {
                    return Err(RunnerError::RemoteFailed {
                        node: node.to_string(),
                        job: id.to_string(),
                        reason,
                    });
                }
                JobState::Cancelled => {
                    warn!(node, job = %id, "remote job was cancelled outside this runner");
                    return Ok(Execution::Cancelled);
                }
                state @ (JobState::Queued | JobState::Running) => {
                    debug!(node, job = %id, ?state, "remote job in progress");
                }
            }

            tokio::select! {
                _ = sleep(self.poll_interval) => {}
                _ = self.cancel.cancelled() => {
                    info!(node, job = %id, "kill requested; withdrawing remote job");
                    self.queue.cancel(&id)?;
                    return Ok(Execution::Cancelled);
                }
            }
        }
    }
}

impl Runner for RemoteRunner {
    fn run<'a>(&'a self, ctx: RunContext<'a>, node: &'a str) -> RunFuture<'a> {
        Box::pin(drive_node(
            ctx,
            node,
            &self.status,
            &self.cancel,
            ArtifactKind::Computed,
            move |slot| self.submit_and_wait(ctx, node, slot),
        ))
    }

    fn kill(&self) {
        if !self.cancel.is_cancelled() {
            debug!("remote runner kill requested");
        }
        self.cancel.cancel();
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
