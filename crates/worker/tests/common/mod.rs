#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use qbench_core::benchmark::{BenchmarkJob, BenchmarkResult};
use qbench_worker::callback::ResultReporter;
use qbench_worker::celery::{RawMessage, BENCHMARK_TASK};
use qbench_worker::engine::{BenchmarkEngine, ComputeError};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Callback receiver
// ---------------------------------------------------------------------------

/// In-process stand-in for the result endpoint.
#[derive(Clone, Default)]
pub struct Receiver {
    posts: Arc<Mutex<Vec<HashMap<String, String>>>>,
    /// Requests to answer with 500 before accepting.
    failures_left: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl Receiver {
    pub fn posts(&self) -> Vec<HashMap<String, String>> {
        self.posts.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

async fn handle_result(
    State(receiver): State<Receiver>,
    Form(fields): Form<HashMap<String, String>>,
) -> StatusCode {
    receiver.attempts.fetch_add(1, Ordering::SeqCst);
    let failing = receiver
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    receiver.posts.lock().unwrap().push(fields);
    StatusCode::OK
}

/// Start a receiver on an ephemeral port. Returns it with its callback URL.
pub async fn start_receiver(fail_first: usize) -> (Receiver, String) {
    let receiver = Receiver {
        failures_left: Arc::new(AtomicUsize::new(fail_first)),
        ..Receiver::default()
    };
    let app = Router::new()
        .route("/handleResult", post(handle_result))
        .with_state(receiver.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (receiver, format!("http://{addr}/handleResult"))
}

/// Reporter with millisecond backoff so retry tests stay fast.
pub fn fast_reporter(url: &str, retries: usize) -> ResultReporter {
    ResultReporter::new(url, Duration::from_secs(5), retries)
        .unwrap()
        .with_retry_delays(vec![Duration::from_millis(10); retries])
}

// ---------------------------------------------------------------------------
// Engines
// ---------------------------------------------------------------------------

pub fn sample_result() -> BenchmarkResult {
    BenchmarkResult {
        average_history: vec![-1.0, -1.12, -1.137],
        accuracy_history: vec![0.2, 0.05, 0.0004],
        qubit_count: 4,
        gate_depth: 21,
        average_iterations: 33.5,
        success_rate: 0.96,
    }
}

/// What a [`FakeEngine`] does when run.
pub enum Behaviour {
    Succeed,
    Fail(&'static str),
    Panic,
}

/// Engine that records the jobs it sees and writes library-style artifacts.
pub struct FakeEngine {
    behaviour: Behaviour,
    pub jobs: Mutex<Vec<BenchmarkJob>>,
    pub artifacts: Vec<&'static str>,
}

impl FakeEngine {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            jobs: Mutex::new(Vec::new()),
            artifacts: vec!["h2.out", "h2.clean", "integrals.hdf5"],
        }
    }
}

#[async_trait]
impl BenchmarkEngine for FakeEngine {
    async fn run(
        &self,
        job: &BenchmarkJob,
        work_dir: &Path,
    ) -> Result<BenchmarkResult, ComputeError> {
        self.jobs.lock().unwrap().push(job.clone());
        for name in &self.artifacts {
            tokio::fs::write(work_dir.join(name), b"artifact").await?;
        }
        match self.behaviour {
            Behaviour::Succeed => Ok(sample_result()),
            Behaviour::Fail(message) => Err(ComputeError::Library(message.to_string())),
            Behaviour::Panic => panic!("library crashed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub fn molecule() -> Value {
    json!({
        "structure": "H 0 0 0\r\nH 0 0 1\r\n",
        "basis_set": "sto-3g",
        "active_orbitals": "A1 1\r\n",
        "transformation": ""
    })
}

/// A protocol v2 benchmark message with positional arguments.
pub fn benchmark_message(metrics_id: i64) -> RawMessage {
    let args = json!([metrics_id, molecule(), "circuit", "scipy", "BFGS"]);
    RawMessage {
        content_type: Some("application/json".into()),
        task: Some(BENCHMARK_TASK.into()),
        id: Some(format!("task-{metrics_id}")),
        body: serde_json::to_vec(&json!([args, {}, {}])).unwrap(),
    }
}
