use std::sync::{Arc, Mutex};

use dagworker::runner::StatusCallback;
use dagworker::types::NodeStatus;

/// Records every `(node, status)` transition reported by a worker.
#[derive(Clone, Default)]
pub struct StatusRecorder {
    events: Arc<Mutex<Vec<(String, NodeStatus)>>>,
}

impl StatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback to hand to `Worker::with_status_callback`.
    pub fn callback(&self) -> StatusCallback {
        let events = Arc::clone(&self.events);
        Arc::new(move |node: &str, status: NodeStatus| {
            events.lock().unwrap().push((node.to_string(), status));
        })
    }

    pub fn events(&self) -> Vec<(String, NodeStatus)> {
        self.events.lock().unwrap().clone()
    }

    /// Transitions reported for one node, in order.
    pub fn statuses_of(&self, node: &str) -> Vec<NodeStatus> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == node)
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn last_status_of(&self, node: &str) -> Option<NodeStatus> {
        self.statuses_of(node).last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    /// Poll until `node` has reported `status`.
    pub async fn wait_for(&self, node: &str, status: NodeStatus) {
        for _ in 0..500 {
            if self.statuses_of(node).contains(&status) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("node {} never reached {:?}", node, status);
    }
}
