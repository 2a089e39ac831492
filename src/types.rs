// src/types.rs

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// Which runner variant a compute request uses.
///
/// - `Local`: run each node as a child process on this machine.
/// - `Remote`: submit each node as a job to the farm queue and wait for it.
/// - `DryRun`: prepare output locations and validate inputs only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Local,
    Remote,
    DryRun,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Mode::Local),
            "remote" => Ok(Mode::Remote),
            "dry-run" | "dry_run" | "dryrun" | "prepare" => Ok(Mode::DryRun),
            other => Err(format!(
                "invalid mode: {other} (expected \"local\", \"remote\" or \"dry-run\")"
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Local => "local",
            Mode::Remote => "remote",
            Mode::DryRun => "dry-run",
        };
        f.write_str(s)
    }
}

/// Computation status of a single node, as reported to status callbacks.
///
/// Valid transitions within one request:
/// `Pending -> Running -> {Done | Error | Cancelled}`, or straight to
/// `Cancelled` when the runner was already killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Pending,
    Running,
    Done,
    Error,
    /// Terminated by an explicit kill; distinct from a computation fault.
    Cancelled,
}
