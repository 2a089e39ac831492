// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod queue;
pub mod runner;
pub mod types;
pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{PipelineFile, load_and_validate};
use crate::env::Environment;
use crate::graph::Graph;
use crate::queue::SpoolQueue;
use crate::worker::{ComputeOutcome, Worker};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline loading and validation
/// - graph, environment and worker construction
/// - the farm spool queue (when `[remote]` is configured)
/// - Ctrl-C → `Worker::kill_child_processes`
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading pipeline {:?}", config_path))?;

    if args.describe {
        print_graph(&Graph::from_pipeline(&cfg));
        return Ok(());
    }

    let mode = args.mode.unwrap_or(cfg.config.mode);
    let worker = Arc::new(build_worker(
        &cfg,
        &config_root_dir(&config_path),
        args.cache.clone(),
    ));

    // Ctrl-C → kill whatever the worker is running; compute then returns.
    {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; killing running computation");
            worker.kill_child_processes();
        });
    }

    let outcome = worker.compute(mode, args.node.as_deref()).await;
    debug!(?outcome, "compute returned");

    match outcome {
        ComputeOutcome::Completed { nodes } => {
            println!("computed {} node(s): {}", nodes.len(), nodes.join(", "));
            Ok(())
        }
        ComputeOutcome::InvalidCache(reason) => bail!("invalid cache location: {reason}"),
        ComputeOutcome::NothingToRun => bail!("nothing to compute: the graph has no leaves"),
        ComputeOutcome::UnknownNode(node) => bail!("unknown node '{node}'"),
        ComputeOutcome::Misconfigured(reason) => bail!("{reason}"),
        ComputeOutcome::Failed { node, reason } => bail!("node '{node}' failed: {reason}"),
        ComputeOutcome::Cancelled { node } => bail!("cancelled while computing '{node}'"),
        ComputeOutcome::Busy => bail!("worker busy"),
    }
}

/// Build a worker for a validated pipeline.
///
/// `base_dir` is where relative paths in the pipeline file are resolved
/// from; `cache_override` replaces `[config].cache` when set.
pub fn build_worker(cfg: &PipelineFile, base_dir: &Path, cache_override: Option<String>) -> Worker {
    let graph = Arc::new(Graph::from_pipeline(cfg));
    let environment = Arc::new(Environment::from_config(&cfg.environment, base_dir));
    let cache = cache_override
        .or_else(|| cfg.config.cache.clone())
        .unwrap_or_default();

    let mut worker = Worker::new(graph, cache, environment);
    if let Some(remote) = &cfg.remote {
        let spool = if remote.spool.is_relative() {
            base_dir.join(&remote.spool)
        } else {
            remote.spool.clone()
        };
        worker = worker
            .with_job_queue(Arc::new(SpoolQueue::new(spool)))
            .with_poll_interval(remote.poll_interval());
    }
    worker
}

/// Directory relative paths in a pipeline file are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "jobs/Pipeline.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Pipeline.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print nodes, their dependencies and the graph's leaves.
fn print_graph(graph: &Graph) {
    println!("dagworker graph");
    println!();

    println!("nodes ({}):", graph.len());
    for node in graph.nodes() {
        println!("  - {}", node.name);
        println!("      cmd: {}", node.cmd);
        if !node.deps.is_empty() {
            println!("      after: {:?}", node.deps);
        }
        if !node.inputs.is_empty() {
            println!("      inputs: {:?}", node.inputs);
        }
        if !node.params.is_empty() {
            println!("      params: {:?}", node.params);
        }
    }

    let leaves: Vec<&str> = graph.leaves().iter().map(|n| n.name.as_str()).collect();
    println!();
    println!("leaves: {:?}", leaves);
}
