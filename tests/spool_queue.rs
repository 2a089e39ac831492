// tests/spool_queue.rs

use std::collections::BTreeMap;
use std::fs;

use tempfile::tempdir;

use dagworker::errors::QueueError;
use dagworker::queue::spool::{CANCELLED_DIR, DONE_DIR, FAILED_DIR, PENDING_DIR, RUNNING_DIR};
use dagworker::queue::{JobId, JobQueue, JobSpec, JobState, SpoolQueue};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn job(node: &str) -> JobSpec {
    let mut env = BTreeMap::new();
    env.insert("DAG_NODE".to_string(), node.to_string());
    JobSpec {
        node: node.to_string(),
        key: "0123456789abcdef0123".to_string(),
        cmd: "meshroom_compute".to_string(),
        output_dir: "/cache/StructureFromMotion/0123".into(),
        cache_root: "/cache".into(),
        working_dir: None,
        env,
    }
}

#[test]
fn submit_writes_a_readable_pending_job() -> TestResult {
    let tmp = tempdir()?;
    let queue = SpoolQueue::new(tmp.path());
    let spec = job("StructureFromMotion");

    let id = queue.submit(&spec)?;

    assert!(id.0.starts_with("StructureFromMotion-0123456789ab-"));
    let pending = tmp.path().join(PENDING_DIR).join(format!("{id}.toml"));
    let decoded: JobSpec = toml::from_str(&fs::read_to_string(&pending)?)?;
    assert_eq!(decoded, spec);

    // No temp files left behind.
    let leftovers: Vec<_> = fs::read_dir(tmp.path().join(PENDING_DIR))?
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
        .collect();
    assert!(leftovers.is_empty());
    assert_eq!(queue.poll(&id)?, JobState::Queued);
    Ok(())
}

#[test]
fn submissions_get_distinct_ids() -> TestResult {
    let tmp = tempdir()?;
    let queue = SpoolQueue::new(tmp.path());

    let first = queue.submit(&job("A"))?;
    let second = queue.submit(&job("A"))?;

    assert_ne!(first, second);
    Ok(())
}

#[test]
fn poll_follows_worker_markers() -> TestResult {
    let tmp = tempdir()?;
    let queue = SpoolQueue::new(tmp.path());
    let id = queue.submit(&job("A"))?;

    fs::create_dir_all(tmp.path().join(RUNNING_DIR))?;
    fs::write(tmp.path().join(RUNNING_DIR).join(&id.0), "")?;
    assert_eq!(queue.poll(&id)?, JobState::Running);

    fs::create_dir_all(tmp.path().join(DONE_DIR))?;
    fs::write(tmp.path().join(DONE_DIR).join(&id.0), "")?;
    assert_eq!(queue.poll(&id)?, JobState::Succeeded);
    Ok(())
}

#[test]
fn failed_marker_carries_the_reason() -> TestResult {
    let tmp = tempdir()?;
    let queue = SpoolQueue::new(tmp.path());
    let with_reason = queue.submit(&job("A"))?;
    let without_reason = queue.submit(&job("B"))?;

    fs::create_dir_all(tmp.path().join(FAILED_DIR))?;
    fs::write(tmp.path().join(FAILED_DIR).join(&with_reason.0), "out of memory\n")?;
    fs::write(tmp.path().join(FAILED_DIR).join(&without_reason.0), "")?;

    assert_eq!(
        queue.poll(&with_reason)?,
        JobState::Failed("out of memory".to_string())
    );
    assert_eq!(
        queue.poll(&without_reason)?,
        JobState::Failed("job failed on farm".to_string())
    );
    Ok(())
}

#[test]
fn cancel_withdraws_a_pending_job() -> TestResult {
    let tmp = tempdir()?;
    let queue = SpoolQueue::new(tmp.path());
    let id = queue.submit(&job("A"))?;

    queue.cancel(&id)?;
    queue.cancel(&id)?;

    assert!(!tmp.path().join(PENDING_DIR).join(format!("{id}.toml")).exists());
    assert!(tmp.path().join(CANCELLED_DIR).join(&id.0).exists());
    assert_eq!(queue.poll(&id)?, JobState::Cancelled);
    Ok(())
}

#[test]
fn cancel_after_completion_is_a_noop() -> TestResult {
    let tmp = tempdir()?;
    let queue = SpoolQueue::new(tmp.path());
    let id = queue.submit(&job("A"))?;
    fs::create_dir_all(tmp.path().join(DONE_DIR))?;
    fs::write(tmp.path().join(DONE_DIR).join(&id.0), "")?;

    queue.cancel(&id)?;

    assert!(!tmp.path().join(CANCELLED_DIR).join(&id.0).exists());
    assert_eq!(queue.poll(&id)?, JobState::Succeeded);
    Ok(())
}

#[test]
fn unknown_job_is_an_error() -> TestResult {
    let tmp = tempdir()?;
    let queue = SpoolQueue::new(tmp.path());

    let result = queue.poll(&JobId("never-submitted".to_string()));

    assert!(matches!(result, Err(QueueError::UnknownJob(id)) if id == "never-submitted"));
    Ok(())
}
