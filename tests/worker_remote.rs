// tests/worker_remote.rs

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use dagworker::build_worker;
use dagworker::config::PipelineFile;
use dagworker::types::{Mode, NodeStatus};
use dagworker::worker::ComputeOutcome;
use dagworker_test_utils::builders::{NodeBuilder, PipelineBuilder};
use dagworker_test_utils::fake_queue::{FakeBehaviour, FakeJobQueue};
use dagworker_test_utils::status::StatusRecorder;
use dagworker_test_utils::{artifact_files, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn pipeline() -> PipelineFile {
    PipelineBuilder::new()
        .with_var("SITE", "farm-a")
        .with_node("CameraInit", NodeBuilder::new("camera_init").build())
        .with_node(
            "FeatureExtraction",
            NodeBuilder::new("feature_extraction")
                .after("CameraInit")
                .param("describerTypes", "sift")
                .build(),
        )
        .build()
}

#[tokio::test]
async fn successful_job_is_recorded_and_reused() -> TestResult {
    init_tracing();
    let tmp = tempdir()?;
    let cache_root = tmp.path().join("cache");
    let queue = Arc::new(FakeJobQueue::new(FakeBehaviour::Succeed));

    let recorder = StatusRecorder::new();
    let worker = build_worker(&pipeline(), tmp.path(), Some(cache_root.display().to_string()))
        .with_job_queue(queue.clone())
        .with_poll_interval(Duration::from_millis(5))
        .with_status_callback(recorder.callback());

    let outcome = with_timeout(worker.compute(Mode::Remote, None)).await;

    assert_eq!(
        outcome,
        ComputeOutcome::Completed {
            nodes: vec!["FeatureExtraction".to_string()]
        }
    );
    let submitted = queue.submitted();
    assert_eq!(submitted.len(), 1);
    let job = &submitted[0];
    assert_eq!(job.node, "FeatureExtraction");
    assert_eq!(job.cmd, "feature_extraction");
    assert_eq!(job.cache_root, cache_root);
    assert!(job.output_dir.starts_with(cache_root.join("FeatureExtraction")));
    assert_eq!(job.env.get("SITE").map(String::as_str), Some("farm-a"));
    assert_eq!(
        job.env.get("DAG_PARAM_DESCRIBERTYPES").map(String::as_str),
        Some("sift")
    );
    assert!(job.env.contains_key("DAG_INPUT_CAMERAINIT"));
    assert_eq!(artifact_files(&cache_root).len(), 1);
    assert_eq!(
        recorder.statuses_of("FeatureExtraction"),
        vec![NodeStatus::Running, NodeStatus::Done]
    );

    // Same inputs: nothing new reaches the farm.
    assert!(with_timeout(worker.compute(Mode::Remote, None)).await.is_success());
    assert_eq!(queue.submitted().len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_job_fails_the_request() -> TestResult {
    init_tracing();
    let tmp = tempdir()?;
    let cache_root = tmp.path().join("cache");
    let queue = Arc::new(FakeJobQueue::new(FakeBehaviour::Fail(
        "license server unreachable".to_string(),
    )));

    let recorder = StatusRecorder::new();
    let worker = build_worker(&pipeline(), tmp.path(), Some(cache_root.display().to_string()))
        .with_job_queue(queue.clone())
        .with_poll_interval(Duration::from_millis(5))
        .with_status_callback(recorder.callback());

    let outcome = with_timeout(worker.compute(Mode::Remote, Some("CameraInit"))).await;

    match outcome {
        ComputeOutcome::Failed { node, reason } => {
            assert_eq!(node, "CameraInit");
            assert!(reason.contains("license server unreachable"), "{}", reason);
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(recorder.last_status_of("CameraInit"), Some(NodeStatus::Error));
    assert!(artifact_files(&cache_root).is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn kill_withdraws_the_pending_job() -> TestResult {
    init_tracing();
    let tmp = tempdir()?;
    let cache_root = tmp.path().join("cache");
    let queue = Arc::new(FakeJobQueue::new(FakeBehaviour::Hang));

    let recorder = StatusRecorder::new();
    let worker = Arc::new(
        build_worker(&pipeline(), tmp.path(), Some(cache_root.display().to_string()))
            .with_job_queue(queue.clone())
            .with_poll_interval(Duration::from_millis(5))
            .with_status_callback(recorder.callback()),
    );

    let handle = {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move { worker.compute(Mode::Remote, None).await })
    };

    recorder
        .wait_for("FeatureExtraction", NodeStatus::Running)
        .await;
    // Make sure the job actually reached the queue before killing.
    for _ in 0..500 {
        if !queue.submitted().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    worker.kill_child_processes();

    let outcome = with_timeout(handle).await?;

    assert_eq!(
        outcome,
        ComputeOutcome::Cancelled {
            node: "FeatureExtraction".to_string()
        }
    );
    assert_eq!(queue.cancelled().len(), 1);
    assert_eq!(
        recorder.last_status_of("FeatureExtraction"),
        Some(NodeStatus::Cancelled)
    );
    assert!(artifact_files(&cache_root).is_empty());
    Ok(())
}

#[tokio::test]
async fn remote_mode_without_queue_is_misconfigured() -> TestResult {
    init_tracing();
    let tmp = tempdir()?;
    let recorder = StatusRecorder::new();
    let worker = build_worker(
        &pipeline(),
        tmp.path(),
        Some(tmp.path().join("cache").display().to_string()),
    )
    .with_status_callback(recorder.callback());

    let outcome = worker.compute(Mode::Remote, None).await;

    assert!(matches!(outcome, ComputeOutcome::Misconfigured(_)), "{:?}", outcome);
    assert!(recorder.is_empty());
    assert!(!worker.is_busy());
    Ok(())
}

#[tokio::test]
async fn prepared_output_does_not_satisfy_a_remote_run() -> TestResult {
    init_tracing();
    let tmp = tempdir()?;
    let cache_root = tmp.path().join("cache");
    let queue = Arc::new(FakeJobQueue::new(FakeBehaviour::Succeed));
    let worker = build_worker(&pipeline(), tmp.path(), Some(cache_root.display().to_string()))
        .with_job_queue(queue.clone())
        .with_poll_interval(Duration::from_millis(5));

    assert!(worker.compute(Mode::DryRun, None).await.is_success());
    assert!(queue.submitted().is_empty());

    assert!(with_timeout(worker.compute(Mode::Remote, None)).await.is_success());
    assert_eq!(queue.submitted().len(), 1);

    // A computed record now satisfies a later dry run as well.
    assert!(worker.compute(Mode::DryRun, None).await.is_success());
    assert_eq!(artifact_files(&cache_root).len(), 1);
    Ok(())
}
