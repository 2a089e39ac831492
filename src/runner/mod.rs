// src/runner/mod.rs

//! Pluggable execution backends ("runners").
//!
//! A worker talks to a `Runner` instead of a concrete execution mechanism,
//! so node logic does not know whether it runs locally, on the farm, or not
//! at all:
//!
//! - [`local`]: child process on this machine.
//! - [`remote`]: job submitted to a [`JobQueue`] and polled to completion.
//! - [`dry_run`]: output preparation and input validation only.
//!
//! The shared cache protocol (key, hit check, artifact write, status
//! transitions) lives in [`drive`], so every variant consults and updates the
//! cache the same way.

pub mod drive;
pub mod dry_run;
pub mod local;
pub mod remote;
pub mod status;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::Cache;
use crate::config::model::DEFAULT_POLL_INTERVAL;
use crate::env::Environment;
use crate::errors::{DagworkerError, RunnerError};
use crate::graph::Graph;
use crate::queue::JobQueue;
use crate::types::Mode;

pub use dry_run::DryRunRunner;
pub use local::LocalRunner;
pub use remote::RemoteRunner;
pub use status::{StatusCallback, StatusSink};

/// Borrowed collaborators for one node invocation.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub graph: &'a Graph,
    pub cache: &'a Cache,
    pub environment: &'a Environment,
}

/// How a node's `run` ended when it did not fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    /// The computation ran and its artifact was written.
    Computed,
    /// A valid artifact already existed; nothing ran.
    Cached,
    /// The runner was killed before or during the computation.
    Cancelled,
}

pub type RunFuture<'a> =
    Pin<Box<dyn Future<Output = Result<NodeOutcome, RunnerError>> + Send + 'a>>;

/// Execution backend for one compute request.
///
/// A runner holds at most one live external computation at a time.
/// `kill` may be called from any thread while `run` is in progress.
pub trait Runner: Send + Sync {
    /// Execute exactly one node: consult the cache, compute on a miss,
    /// store the artifact, and report status transitions as they happen.
    fn run<'a>(&'a self, ctx: RunContext<'a>, node: &'a str) -> RunFuture<'a>;

    /// Request termination of the in-flight computation, if any.
    ///
    /// Idempotent. Once killed, later `run` calls return
    /// [`NodeOutcome::Cancelled`] without starting anything.
    fn kill(&self);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Settings needed to build any runner variant.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub job_queue: Option<Arc<dyn JobQueue>>,
    pub poll_interval: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            job_queue: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Build the runner variant for `mode`, with `status` wired in.
///
/// This is the only place that maps a [`Mode`] to a concrete runner.
pub fn create(
    mode: Mode,
    settings: &RunnerSettings,
    status: StatusSink,
) -> Result<Arc<dyn Runner>, DagworkerError> {
    debug!(%mode, "creating runner");
    let runner: Arc<dyn Runner> = match mode {
        Mode::Local => Arc::new(LocalRunner::new(status)),
        Mode::Remote => {
            let queue = settings.job_queue.clone().ok_or_else(|| {
                DagworkerError::ConfigError(
                    "remote mode requires a job queue (configure [remote].spool)".to_string(),
                )
            })?;
            Arc::new(RemoteRunner::new(status, queue, settings.poll_interval))
        }
        Mode::DryRun => Arc::new(DryRunRunner::new(status)),
    };
    Ok(runner)
}
