// src/worker/active.rs

//! The worker's "current runner" slot.
//!
//! `compute` and `kill_child_processes` run on different threads, so the
//! slot lives behind a mutex and is only ever released by dropping the
//! [`RequestGuard`], which happens on every exit path of a request.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::runner::Runner;

enum SlotState {
    Idle,
    /// A request is running but has not created its runner yet.
    Reserved { kill_requested: bool },
    Active(Arc<dyn Runner>),
}

pub struct ActiveRunner {
    slot: Mutex<SlotState>,
}

impl Default for ActiveRunner {
    fn default() -> Self {
        Self {
            slot: Mutex::new(SlotState::Idle),
        }
    }
}

impl ActiveRunner {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // A panic while holding the lock cannot leave the slot half-written.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reserve the slot for a new request. `None` if one is already running.
    pub fn begin(&self) -> Option<RequestGuard<'_>> {
        let mut slot = self.lock();
        match *slot {
            SlotState::Idle => {
                *slot = SlotState::Reserved {
                    kill_requested: false,
                };
                Some(RequestGuard { owner: self })
            }
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        !matches!(*self.lock(), SlotState::Idle)
    }

    /// Forward a kill to the active runner.
    ///
    /// A kill that arrives before the runner exists is remembered and applied
    /// when it is installed. Returns whether a request was running.
    pub fn kill(&self) -> bool {
        let mut slot = self.lock();
        match &mut *slot {
            SlotState::Active(runner) => {
                info!(runner = runner.name(), "killing active runner");
                runner.kill();
                true
            }
            SlotState::Reserved { kill_requested } => {
                info!("kill requested before runner start; will cancel on install");
                *kill_requested = true;
                true
            }
            SlotState::Idle => {
                debug!("kill requested while idle; nothing to do");
                false
            }
        }
    }
}

/// Exclusive hold on the slot for one request.
pub struct RequestGuard<'a> {
    owner: &'a ActiveRunner,
}

impl RequestGuard<'_> {
    /// Publish the request's runner so `kill` can reach it.
    pub fn install(&mut self, runner: Arc<dyn Runner>) -> Arc<dyn Runner> {
        let mut slot = self.owner.lock();
        if let SlotState::Reserved {
            kill_requested: true,
        } = *slot
        {
            runner.kill();
        }
        *slot = SlotState::Active(Arc::clone(&runner));
        runner
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.owner.lock();
        *slot = SlotState::Idle;
        debug!("released runner slot");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::runner::{NodeOutcome, RunContext, RunFuture};

    #[derive(Default)]
    struct CountingRunner {
        kills: AtomicUsize,
    }

    impl Runner for CountingRunner {
        fn run<'a>(&'a self, _ctx: RunContext<'a>, _node: &'a str) -> RunFuture<'a> {
            Box::pin(async { Ok(NodeOutcome::Cancelled) })
        }

        fn kill(&self) {
            self.kills.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn kill_before_install_is_applied_on_install() {
        let active = ActiveRunner::default();
        let runner = Arc::new(CountingRunner::default());

        let mut guard = active.begin().expect("slot should be idle");
        assert!(active.kill());
        assert_eq!(runner.kills.load(Ordering::SeqCst), 0);

        guard.install(runner.clone());
        assert_eq!(runner.kills.load(Ordering::SeqCst), 1);

        drop(guard);
        assert!(!active.is_busy());
        assert!(!active.kill());
        assert_eq!(runner.kills.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn kill_reaches_installed_runner_and_slot_is_exclusive() {
        let active = ActiveRunner::default();
        let runner = Arc::new(CountingRunner::default());

        let mut guard = active.begin().expect("slot should be idle");
        guard.install(runner.clone());
        assert_eq!(runner.kills.load(Ordering::SeqCst), 0);
        assert!(active.begin().is_none());

        assert!(active.kill());
        assert_eq!(runner.kills.load(Ordering::SeqCst), 1);

        drop(guard);
        assert!(active.begin().is_some());
    }
}
