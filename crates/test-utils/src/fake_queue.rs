use std::collections::HashMap;
use std::sync::Mutex;

use dagworker::errors::QueueError;
use dagworker::queue::{JobId, JobQueue, JobSpec, JobState};

/// What the fake farm does with each submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// Report success on the first poll.
    Succeed,
    /// Report failure with the given reason on the first poll.
    Fail(String),
    /// Stay `Running` until cancelled.
    Hang,
}

/// In-memory job queue that:
/// - records every submitted job
/// - resolves jobs according to a fixed `FakeBehaviour`
/// - records cancellations
#[derive(Debug)]
pub struct FakeJobQueue {
    behaviour: FakeBehaviour,
    submitted: Mutex<Vec<JobSpec>>,
    states: Mutex<HashMap<String, JobState>>,
    cancelled: Mutex<Vec<JobId>>,
}

impl FakeJobQueue {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        Self {
            behaviour,
            submitted: Mutex::new(Vec::new()),
            states: Mutex::new(HashMap::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<JobSpec> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<JobId> {
        self.cancelled.lock().unwrap().clone()
    }
}

impl JobQueue for FakeJobQueue {
    fn submit(&self, job: &JobSpec) -> Result<JobId, QueueError> {
        let mut submitted = self.submitted.lock().unwrap();
        let id = JobId(format!("fake-{}", submitted.len()));
        submitted.push(job.clone());

        let state = match &self.behaviour {
            FakeBehaviour::Succeed => JobState::Succeeded,
            FakeBehaviour::Fail(reason) => JobState::Failed(reason.clone()),
            FakeBehaviour::Hang => JobState::Running,
        };
        self.states.lock().unwrap().insert(id.0.clone(), state);
        Ok(id)
    }

    fn poll(&self, id: &JobId) -> Result<JobState, QueueError> {
        self.states
            .lock()
            .unwrap()
            .get(&id.0)
            .cloned()
            .ok_or_else(|| QueueError::UnknownJob(id.0.clone()))
    }

    fn cancel(&self, id: &JobId) -> Result<(), QueueError> {
        self.cancelled.lock().unwrap().push(id.clone());
        self.states
            .lock()
            .unwrap()
            .insert(id.0.clone(), JobState::Cancelled);
        Ok(())
    }
}
