// src/worker/worker.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::cache::{Cache, CacheLocation};
use crate::env::Environment;
use crate::graph::Graph;
use crate::queue::JobQueue;
use crate::runner::{self, NodeOutcome, RunContext, RunnerSettings, StatusCallback, StatusSink};
use crate::types::Mode;
use crate::worker::active::ActiveRunner;

/// How a compute request ended.
///
/// `compute` never fails with an error; every fault is logged and turned
/// into one of these outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeOutcome {
    /// Every resolved node finished (computed or cache hit), in order.
    Completed { nodes: Vec<String> },
    /// The cache location could not be parsed or created. Nothing ran.
    InvalidCache(String),
    /// No start node was given and the graph has no leaves.
    NothingToRun,
    /// The named start node is not part of the graph.
    UnknownNode(String),
    /// The runner for the requested mode could not be created.
    Misconfigured(String),
    /// A node faulted; later nodes were abandoned.
    Failed { node: String, reason: String },
    /// The request was killed while `node` was being processed.
    Cancelled { node: String },
    /// Another request was already running on this worker.
    Busy,
}

impl ComputeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ComputeOutcome::Completed { .. })
    }
}

/// Node names a request operates on.
///
/// A non-empty `start` yields exactly that node; otherwise every leaf of
/// the graph, in the order the graph reports them.
pub fn resolve_start_nodes(graph: &Graph, start: Option<&str>) -> Vec<String> {
    match start.filter(|s| !s.is_empty()) {
        Some(name) => vec![name.to_string()],
        None => graph.leaves().into_iter().map(|n| n.name.clone()).collect(),
    }
}

/// Drives compute requests over a graph.
///
/// The graph and environment are shared read-only. One runner is created
/// per request and released when the request ends, whichever way it ends.
/// `kill_child_processes` may be called from any thread at any time.
pub struct Worker {
    graph: Arc<Graph>,
    cache_location: String,
    environment: Arc<Environment>,
    settings: RunnerSettings,
    on_status: Option<StatusCallback>,
    active: ActiveRunner,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("cache_location", &self.cache_location)
            .field("nodes", &self.graph.len())
            .field("settings", &self.settings)
            .field("busy", &self.active.is_busy())
            .finish_non_exhaustive()
    }
}

impl Worker {
    pub fn new(
        graph: Arc<Graph>,
        cache_location: impl Into<String>,
        environment: Arc<Environment>,
    ) -> Self {
        Self {
            graph,
            cache_location: cache_location.into(),
            environment,
            settings: RunnerSettings::default(),
            on_status: None,
            active: ActiveRunner::default(),
        }
    }

    /// Queue used by [`Mode::Remote`] requests.
    pub fn with_job_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.settings.job_queue = Some(queue);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval = interval;
        self
    }

    /// Callback receiving every `(node, status)` transition.
    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Whether a compute request is currently in progress.
    pub fn is_busy(&self) -> bool {
        self.active.is_busy()
    }

    /// Run `start` (or every leaf when `None`) with the runner for `mode`.
    ///
    /// Nodes are processed one after the other; the first fault or
    /// cancellation abandons the rest of the request.
    pub async fn compute(&self, mode: Mode, start: Option<&str>) -> ComputeOutcome {
        let Some(mut request) = self.active.begin() else {
            warn!(%mode, ?start, "compute requested while another request is running");
            return ComputeOutcome::Busy;
        };

        let location = match CacheLocation::parse(&self.cache_location) {
            Ok(location) => location,
            Err(e) => {
                error!(error = %e, "invalid cache location; aborting compute");
                return ComputeOutcome::InvalidCache(e.to_string());
            }
        };
        if let Err(e) = location.ensure() {
            error!(error = %e, "cannot create cache root; aborting compute");
            return ComputeOutcome::InvalidCache(e.to_string());
        }

        let nodes = resolve_start_nodes(&self.graph, start);
        if nodes.is_empty() {
            warn!("no start node given and the graph has no leaves; nothing to compute");
            return ComputeOutcome::NothingToRun;
        }
        if let Some(unknown) = nodes.iter().find(|n| !self.graph.contains(n)) {
            error!(node = %unknown, "start node is not part of the graph");
            return ComputeOutcome::UnknownNode(unknown.clone());
        }

        let status = StatusSink::new(self.on_status.clone());
        let runner = match runner::create(mode, &self.settings, status) {
            Ok(runner) => request.install(runner),
            Err(e) => {
                error!(%mode, error = %e, "cannot create runner; aborting compute");
                return ComputeOutcome::Misconfigured(e.to_string());
            }
        };

        info!(
            %mode,
            runner = runner.name(),
            start = start.unwrap_or(""),
            ?nodes,
            "compute request started"
        );

        let cache = Cache::open(&location);
        let ctx = RunContext {
            graph: &self.graph,
            cache: &cache,
            environment: &self.environment,
        };

        let mut finished = Vec::with_capacity(nodes.len());
        for node in nodes {
            match runner.run(ctx, &node).await {
                Ok(NodeOutcome::Computed | NodeOutcome::Cached) => finished.push(node),
                Ok(NodeOutcome::Cancelled) => {
                    warn!(node = %node, "compute request cancelled; abandoning remaining nodes");
                    return ComputeOutcome::Cancelled { node };
                }
                Err(e) => {
                    error!(node = %node, error = %e, "node failed; aborting compute request");
                    return ComputeOutcome::Failed {
                        node,
                        reason: e.to_string(),
                    };
                }
            }
        }

        info!(nodes = ?finished, "compute request finished");
        ComputeOutcome::Completed { nodes: finished }
    }

    /// Kill the computation of the running request, if any.
    ///
    /// A no-op when idle.
    pub fn kill_child_processes(&self) {
        self.active.kill();
    }
}
