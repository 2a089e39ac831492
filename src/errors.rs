// src/errors.rs

//! Error types, one enum per layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagworkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in pipeline graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, DagworkerError>;

/// Faults from the cache location or the artifact store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid cache location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("cache IO error at {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("node '{node}' declares missing input {path:?}")]
    MissingInput {
        node: String,
        path: std::path::PathBuf,
    },

    #[error("node '{0}' is not part of the graph")]
    UnknownNode(String),

    #[error("could not encode artifact record for node '{node}': {reason}")]
    Encode { node: String, reason: String },
}

/// Faults from the remote job queue.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("job queue IO error at {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode job for node '{node}': {reason}")]
    Encode { node: String, reason: String },

    #[error("unknown job '{0}'")]
    UnknownJob(String),
}

/// Faults raised by a runner while executing one node.
///
/// Cancellation is not a fault; runners report it as
/// [`NodeOutcome::Cancelled`](crate::runner::NodeOutcome::Cancelled).
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("failed to spawn process for node '{node}': {source}")]
    Spawn {
        node: String,
        #[source]
        source: std::io::Error,
    },

    #[error("node '{node}' exited with code {code}")]
    ExitStatus { node: String, code: i32 },

    #[error("remote job {job} for node '{node}' failed: {reason}")]
    RemoteFailed {
        node: String,
        job: String,
        reason: String,
    },

    #[error("node '{node}' input validation failed: {reason}")]
    Validation { node: String, reason: String },
}
