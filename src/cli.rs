// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Mode;

/// Command-line arguments for `dagworker`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagworker",
    version,
    about = "Compute a pipeline graph locally, on a render farm, or as a dry run.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Pipeline.toml")]
    pub config: String,

    /// Execution mode. Defaults to `[config].mode` from the pipeline file.
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<Mode>,

    /// Compute only this node instead of every leaf of the graph.
    #[arg(long, value_name = "NAME")]
    pub node: Option<String>,

    /// Cache root (path or file:// URI); overrides `[config].cache`.
    #[arg(long, value_name = "LOCATION")]
    pub cache: Option<String>,

    /// Print the graph (nodes, dependencies, leaves) and exit.
    #[arg(long)]
    pub describe: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGWORKER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
