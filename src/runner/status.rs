// src/runner/status.rs

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::types::NodeStatus;

/// Caller-supplied sink for `(node, status)` transitions.
///
/// Invoked on the task driving the compute request.
pub type StatusCallback = Arc<dyn Fn(&str, NodeStatus) + Send + Sync>;

/// Optional status callback, cheap to clone into each runner.
#[derive(Clone, Default)]
pub struct StatusSink {
    callback: Option<StatusCallback>,
}

impl StatusSink {
    pub fn new(callback: Option<StatusCallback>) -> Self {
        Self { callback }
    }

    pub fn emit(&self, node: &str, status: NodeStatus) {
        debug!(node, ?status, "node status changed");
        if let Some(callback) = &self.callback {
            callback(node, status);
        }
    }
}

impl fmt::Debug for StatusSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusSink")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
