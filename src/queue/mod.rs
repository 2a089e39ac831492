// src/queue/mod.rs

//! Remote job queue abstraction used by the remote runner.
//!
//! The remote runner talks to a `JobQueue` instead of a concrete farm
//! protocol. [`spool`] provides a directory-based queue that render-farm
//! workers can consume; tests provide their own in-memory queue.

pub mod spool;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::QueueError;

pub use spool::SpoolQueue;

/// Identifier handed out by a queue on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a farm worker needs to compute one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub node: String,
    pub key: String,
    pub cmd: String,
    pub output_dir: PathBuf,
    pub cache_root: PathBuf,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Last known state of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed(String),
    Cancelled,
}

/// Submission, status and withdrawal of farm jobs.
pub trait JobQueue: Send + Sync + fmt::Debug {
    fn submit(&self, job: &JobSpec) -> Result<JobId, QueueError>;
    fn poll(&self, id: &JobId) -> Result<JobState, QueueError>;
    /// Withdraw a job. Cancelling a job that already finished is a no-op.
    fn cancel(&self, id: &JobId) -> Result<(), QueueError>;
}
