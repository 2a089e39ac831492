// src/runner/local.rs

//! Runs each node as a child process on this machine.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ArtifactKind;
use crate::errors::{CacheError, RunnerError};
use crate::runner::drive::{Execution, OutputSlot, drive_node, node_env};
use crate::runner::status::StatusSink;
use crate::runner::{RunContext, RunFuture, Runner};

/// Local child-process runner.
///
/// Each node's `cmd` is run through the platform shell with the node's
/// variables exported. `kill` terminates the running child; the node then
/// reports `Cancelled` and no artifact is written.
#[derive(Debug)]
pub struct LocalRunner {
    status: StatusSink,
    cancel: CancellationToken,
}

impl LocalRunner {
    pub fn new(status: StatusSink) -> Self {
        Self {
            status,
            cancel: CancellationToken::new(),
        }
    }

    async fn spawn_and_wait(
        &self,
        ctx: RunContext<'_>,
        node: &str,
        slot: OutputSlot,
    ) -> Result<Execution, RunnerError> {
        let spec = ctx
            .graph
            .node(node)
            .ok_or_else(|| CacheError::UnknownNode(node.to_string()))?;
        let vars = node_env(ctx, node, &slot)?;

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&spec.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&spec.cmd);
            c
        };

        cmd.envs(&vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = ctx.environment.working_dir().filter(|d| d.is_dir()) {
            cmd.current_dir(dir);
        }
        // Own process group, so a kill reaches everything the shell forks.
        #[cfg(unix)]
        cmd.process_group(0);

        if self.cancel.is_cancelled() {
            info!(node, "kill requested before spawn; not starting node process");
            return Ok(Execution::Cancelled);
        }

        info!(node, cmd = %spec.cmd, output_dir = ?slot.output_dir, "starting node process");

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            node: node.to_string(),
            source,
        })?;

        if let Some(stdout) = child.stdout.take() {
            drain_lines(node.to_string(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            drain_lines(node.to_string(), "stderr", stderr);
        }

        tokio::select! {
            status_res = child.wait() => {
                let status = status_res.map_err(|source| RunnerError::Spawn {
                    node: node.to_string(),
                    source,
                })?;
                let code = status.code().unwrap_or(-1);

                info!(node, exit_code = code, success = status.success(), "node process exited");

                if status.success() {
                    Ok(Execution::Finished)
                } else {
                    Err(RunnerError::ExitStatus {
                        node: node.to_string(),
                        code,
                    })
                }
            }

            _ = self.cancel.cancelled() => {
                info!(node, "kill requested; terminating node process group");
                terminate(node, &mut child).await;
                Ok(Execution::Cancelled)
            }
        }
    }
}

impl Runner for LocalRunner {
    fn run<'a>(&'a self, ctx: RunContext<'a>, node: &'a str) -> RunFuture<'a> {
        Box::pin(drive_node(
            ctx,
            node,
            &self.status,
            &self.cancel,
            ArtifactKind::Computed,
            move |slot| self.spawn_and_wait(ctx, node, slot),
        ))
    }

    fn kill(&self) {
        if !self.cancel.is_cancelled() {
            debug!("local runner kill requested");
        }
        self.cancel.cancel();
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Consume a child's output pipe so buffers never fill; log each line.
fn drain_lines<R>(node: String, stream: &'static str, pipe: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(node = %node, stream, "{}", line);
        }
    });
}

/// Kill the child and every process in its group, then reap the child.
async fn terminate(node: &str, child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            warn!(node, pid, error = %e, "failed to signal node process group");
        }
    }

    if let Err(e) = child.kill().await {
        warn!(node, error = %e, "failed to kill node process");
    }
}
