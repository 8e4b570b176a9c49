//! End-to-end tests of the benchmark task: decode, compute, report, clean up.
//!
//! The callback endpoint is an in-process axum server on an ephemeral port
//! and the benchmark library is replaced by a fake engine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{benchmark_message, fast_reporter, sample_result, start_receiver, Behaviour, FakeEngine};
use qbench_core::benchmark::{BenchmarkRequest, BenchmarkResult};
use qbench_worker::broker::ChannelTaskSource;
use qbench_worker::celery::RawMessage;
use qbench_worker::runner::{RunSummary, Worker};
use qbench_worker::task::TaskHandler;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn request(metrics_id: i64) -> BenchmarkRequest {
    serde_json::from_value(json!({
        "metrics_id": metrics_id,
        "molecule": common::molecule(),
        "circuit": "circuit",
        "optimizer_module": "scipy",
        "optimizer_method": "BFGS"
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Task handler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_posts_the_result_as_a_data_field() {
    let (receiver, url) = start_receiver(0).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(Behaviour::Succeed));
    let handler = TaskHandler::new(engine.clone(), fast_reporter(&url, 0), dir.path(), false);

    let outcome = handler.handle(request(42)).await;

    assert!(outcome.succeeded());
    assert!(outcome.reported);

    let posts = receiver.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].len(), 1, "only the data field is sent");
    let data: Value = serde_json::from_str(&posts[0]["data"]).unwrap();
    assert_eq!(data["metrics_id"], 42);
    assert_eq!(data.as_object().unwrap().len(), 7);
    let result: BenchmarkResult = serde_json::from_value(data).unwrap();
    assert_eq!(result, sample_result());
}

#[tokio::test]
async fn engine_receives_the_normalized_job() {
    let (_receiver, url) = start_receiver(0).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(Behaviour::Succeed));
    let handler = TaskHandler::new(engine.clone(), fast_reporter(&url, 0), dir.path(), false);

    handler.handle(request(42)).await;

    let jobs = engine.jobs.lock().unwrap();
    let job = &jobs[0];
    assert_eq!(job.molecule.transformation, None);
    assert_eq!(job.molecule.structure, "H 0 0 0\nH 0 0 1\n");
    assert_eq!(job.molecule.active_orbitals, "A1 1\n");
    assert_eq!(job.backend, "qulacs");
    assert_eq!(job.repetitions, 100);
}

#[tokio::test]
async fn library_failure_posts_the_fixed_error() {
    let (receiver, url) = start_receiver(0).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(Behaviour::Fail("optimizer not found")));
    let handler = TaskHandler::new(engine, fast_reporter(&url, 0), dir.path(), false);

    let outcome = handler.handle(request(9)).await;

    assert!(!outcome.succeeded());
    assert_eq!(outcome.failure.unwrap().reason, "optimizer not found");

    let posts = receiver.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].len(), 2);
    assert_eq!(posts[0]["error"], "error occurred in analysis");
    assert_eq!(posts[0]["metrics_id"], "9");
}

#[tokio::test]
async fn engine_panic_is_reported_as_failure() {
    let (receiver, url) = start_receiver(0).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(Behaviour::Panic));
    let handler = TaskHandler::new(engine, fast_reporter(&url, 0), dir.path(), false);

    let outcome = handler.handle(request(5)).await;

    assert_eq!(outcome.failure.unwrap().reason, "computation failed");
    assert_eq!(receiver.posts()[0]["error"], "error occurred in analysis");
    // Artifacts written before the crash are still removed.
    assert_eq!(outcome.cleanup.removed.len(), 3);
}

#[tokio::test]
async fn artifacts_are_removed_and_other_files_kept() {
    let (_receiver, url) = start_receiver(0).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("stale.out"), b"old").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();
    std::fs::write(dir.path().join(".hidden.hdf5"), b"keep").unwrap();

    let engine = Arc::new(FakeEngine::new(Behaviour::Succeed));
    let handler = TaskHandler::new(engine, fast_reporter(&url, 0), dir.path(), false);
    let outcome = handler.handle(request(1)).await;

    assert_eq!(outcome.cleanup.removed.len(), 4);
    assert!(outcome.cleanup.failed.is_empty());

    let mut remaining: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec![".hidden.hdf5", "notes.txt"]);
}

#[tokio::test]
async fn isolated_tasks_leave_the_shared_directory_alone() {
    let (_receiver, url) = start_receiver(0).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("other-worker.out"), b"in use").unwrap();

    let engine = Arc::new(FakeEngine::new(Behaviour::Succeed));
    let handler = TaskHandler::new(engine, fast_reporter(&url, 0), dir.path(), true);
    let outcome = handler.handle(request(1)).await;

    assert_eq!(outcome.cleanup.removed.len(), 3);
    let remaining: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(remaining, vec!["other-worker.out"], "scratch directory is removed");
}

#[tokio::test]
async fn callback_is_retried_until_accepted() {
    let (receiver, url) = start_receiver(2).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(Behaviour::Succeed));
    let handler = TaskHandler::new(engine, fast_reporter(&url, 3), dir.path(), false);

    let outcome = handler.handle(request(3)).await;

    assert!(outcome.reported);
    assert_eq!(receiver.attempts(), 3);
    assert_eq!(receiver.posts().len(), 1);
}

#[tokio::test]
async fn undeliverable_result_still_cleans_up() {
    let (receiver, url) = start_receiver(10).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(Behaviour::Succeed));
    let handler = TaskHandler::new(engine, fast_reporter(&url, 1), dir.path(), false);

    let outcome = handler.handle(request(3)).await;

    assert!(outcome.succeeded());
    assert!(!outcome.reported);
    assert_eq!(receiver.attempts(), 2);
    assert_eq!(outcome.cleanup.removed.len(), 3);
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn worker_handles_messages_in_order_and_drops_garbage() {
    let (receiver, url) = start_receiver(0).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(Behaviour::Succeed));
    let handler = TaskHandler::new(engine, fast_reporter(&url, 0), dir.path(), false);

    let (sender, source) = ChannelTaskSource::new(8);
    sender.send(benchmark_message(1)).await.unwrap();
    sender
        .send(RawMessage {
            body: b"not json".to_vec(),
            ..benchmark_message(2)
        })
        .await
        .unwrap();
    sender.send(benchmark_message(3)).await.unwrap();
    drop(sender);

    let summary = Worker::new(source, handler)
        .run(CancellationToken::new())
        .await;

    assert_eq!(
        summary,
        RunSummary {
            processed: 2,
            rejected: 1
        }
    );
    let ids: Vec<i64> = receiver
        .posts()
        .iter()
        .map(|post| {
            let data: Value = serde_json::from_str(&post["data"]).unwrap();
            data["metrics_id"].as_i64().unwrap()
        })
        .collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn cancelled_worker_stops_while_idle() {
    let (_receiver, url) = start_receiver(0).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new(Behaviour::Succeed));
    let handler = TaskHandler::new(engine, fast_reporter(&url, 0), dir.path(), false);

    // Keep the sender alive so the source never exhausts.
    let (_sender, source) = ChannelTaskSource::new(1);
    let cancel = CancellationToken::new();
    let run = tokio::spawn(
        Worker::new(source, handler)
            .with_reconnect_delay(Duration::from_millis(10))
            .run(cancel.clone()),
    );

    cancel.cancel();
    let summary = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("worker did not stop")
        .unwrap();
    assert_eq!(summary, RunSummary::default());
}
