// src/queue/spool.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::errors::QueueError;
use crate::queue::{JobId, JobQueue, JobSpec, JobState};

pub const PENDING_DIR: &str = "pending";
pub const RUNNING_DIR: &str = "running";
pub const DONE_DIR: &str = "done";
pub const FAILED_DIR: &str = "failed";
pub const CANCELLED_DIR: &str = "cancelled";

/// Directory-based job queue shared with farm workers.
///
/// Layout under the spool root:
///
/// - `pending/<id>.toml`: submitted job description (a [`JobSpec`]).
///   Files starting with `.` are in-flight writes and must be ignored.
/// - `running/<id>`: created by a worker when it picks the job up.
/// - `done/<id>`: created by a worker on success.
/// - `failed/<id>`: created by a worker on failure; contents are the reason.
/// - `cancelled/<id>`: written by [`JobQueue::cancel`].
#[derive(Debug, Clone)]
pub struct SpoolQueue {
    root: PathBuf,
    counter: Arc<AtomicU64>,
}

impl SpoolQueue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pending_file(&self, id: &JobId) -> PathBuf {
        self.root.join(PENDING_DIR).join(format!("{id}.toml"))
    }

    fn marker(&self, dir: &str, id: &JobId) -> PathBuf {
        self.root.join(dir).join(&id.0)
    }

    fn next_id(&self, job: &JobSpec) -> JobId {
        let short_key: String = job.key.chars().take(12).collect();
        JobId(format!(
            "{}-{}-{}-{}",
            job.node,
            short_key,
            std::process::id(),
            self.counter.fetch_add(1, Ordering::Relaxed)
        ))
    }
}

impl JobQueue for SpoolQueue {
    fn submit(&self, job: &JobSpec) -> Result<JobId, QueueError> {
        let pending = self.root.join(PENDING_DIR);
        create_dir(&pending)?;

        let id = self.next_id(job);
        let encoded = toml::to_string(job).map_err(|e| QueueError::Encode {
            node: job.node.clone(),
            reason: e.to_string(),
        })?;

        let tmp = pending.join(format!(".{id}.toml.tmp"));
        let target = self.pending_file(&id);
        fs::write(&tmp, encoded).map_err(|source| io_err(&tmp, source))?;
        fs::rename(&tmp, &target).map_err(|source| io_err(&target, source))?;

        info!(job = %id, node = %job.node, spool = ?self.root, "submitted job to spool");
        Ok(id)
    }

    fn poll(&self, id: &JobId) -> Result<JobState, QueueError> {
        if self.marker(CANCELLED_DIR, id).exists() {
            return Ok(JobState::Cancelled);
        }

        let failed = self.marker(FAILED_DIR, id);
        if failed.exists() {
            let reason = fs::read_to_string(&failed).map_err(|source| io_err(&failed, source))?;
            let reason = reason.trim();
            let reason = if reason.is_empty() {
                "job failed on farm".to_string()
            } else {
                reason.to_string()
            };
            return Ok(JobState::Failed(reason));
        }

        if self.marker(DONE_DIR, id).exists() {
            return Ok(JobState::Succeeded);
        }
        if self.marker(RUNNING_DIR, id).exists() {
            return Ok(JobState::Running);
        }
        if self.pending_file(id).exists() {
            return Ok(JobState::Queued);
        }

        Err(QueueError::UnknownJob(id.0.clone()))
    }

    fn cancel(&self, id: &JobId) -> Result<(), QueueError> {
        if self.marker(DONE_DIR, id).exists() || self.marker(FAILED_DIR, id).exists() {
            debug!(job = %id, "job already finished; nothing to cancel");
            return Ok(());
        }

        let pending = self.pending_file(id);
        match fs::remove_file(&pending) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(io_err(&pending, source)),
        }

        let cancelled_dir = self.root.join(CANCELLED_DIR);
        create_dir(&cancelled_dir)?;
        let marker = self.marker(CANCELLED_DIR, id);
        fs::write(&marker, b"").map_err(|source| io_err(&marker, source))?;

        info!(job = %id, "cancelled spooled job");
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), QueueError> {
    fs::create_dir_all(dir).map_err(|source| io_err(dir, source))
}

fn io_err(path: &Path, source: std::io::Error) -> QueueError {
    QueueError::Io {
        path: path.to_path_buf(),
        source,
    }
}
