//! The benchmark task: compute, report, clean up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use qbench_core::benchmark::{
    BenchmarkJob, BenchmarkRequest, ComputeFailure, ComputeOutcome, ResultEnvelope,
};
use qbench_core::types::DbId;
use uuid::Uuid;

use crate::callback::ResultReporter;
use crate::cleanup::{self, CleanupReport};
use crate::engine::BenchmarkEngine;

/// Summary of one handled task, for logging by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub metrics_id: DbId,
    /// `None` when the benchmark succeeded.
    pub failure: Option<ComputeFailure>,
    /// Whether the callback endpoint accepted the envelope.
    pub reported: bool,
    pub cleanup: CleanupReport,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Executes benchmark tasks one at a time.
pub struct TaskHandler {
    engine: Arc<dyn BenchmarkEngine>,
    reporter: ResultReporter,
    work_dir: PathBuf,
    isolation: bool,
}

impl TaskHandler {
    pub fn new(
        engine: Arc<dyn BenchmarkEngine>,
        reporter: ResultReporter,
        work_dir: impl Into<PathBuf>,
        isolation: bool,
    ) -> Self {
        Self {
            engine,
            reporter,
            work_dir: work_dir.into(),
            isolation,
        }
    }

    /// Run one benchmark request to completion.
    ///
    /// Never fails: computation, callback and cleanup errors are logged and
    /// reflected in the returned [`TaskOutcome`].
    pub async fn handle(&self, request: BenchmarkRequest) -> TaskOutcome {
        let (metrics_id, job) = request.into_job();
        tracing::info!(metrics_id, "Benchmark task started");

        let scratch = self.scratch_dir();
        let outcome = match self.prepare(&scratch).await {
            Ok(()) => self.compute(job, &scratch).await,
            Err(failure) => Err(failure),
        };
        if let Err(failure) = &outcome {
            tracing::warn!(metrics_id, reason = %failure, "Benchmark failed");
        }
        let failure = outcome.as_ref().err().cloned();

        let envelope = ResultEnvelope::from_outcome(metrics_id, outcome);
        let reported = match self.reporter.report(&envelope).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(metrics_id, error = %e, "Result was not delivered");
                false
            }
        };

        let cleanup = cleanup::remove_output_files(&scratch).await;
        if self.isolation {
            self.discard(&scratch).await;
        }

        let outcome = TaskOutcome {
            metrics_id,
            failure,
            reported,
            cleanup,
        };
        tracing::info!(
            metrics_id,
            succeeded = outcome.succeeded(),
            reported,
            removed = outcome.cleanup.removed.len(),
            "Benchmark task finished"
        );
        outcome
    }

    fn scratch_dir(&self) -> PathBuf {
        if self.isolation {
            self.work_dir.join(format!("task-{}", Uuid::new_v4()))
        } else {
            self.work_dir.clone()
        }
    }

    async fn prepare(&self, scratch: &Path) -> Result<(), ComputeFailure> {
        if !self.isolation {
            return Ok(());
        }
        tokio::fs::create_dir_all(scratch).await.map_err(|e| {
            ComputeFailure::new(format!(
                "cannot create scratch directory {}: {e}",
                scratch.display()
            ))
        })
    }

    /// Run the engine on its own task so a panic becomes a failure.
    async fn compute(&self, job: BenchmarkJob, scratch: &Path) -> ComputeOutcome {
        let engine = Arc::clone(&self.engine);
        let scratch = scratch.to_path_buf();
        let handle = tokio::spawn(async move { engine.run(&job, &scratch).await });

        match handle.await {
            Ok(result) => result.map_err(ComputeFailure::from),
            Err(e) => {
                tracing::error!(error = %e, "Benchmark engine panicked");
                Err(ComputeFailure::unspecified())
            }
        }
    }

    async fn discard(&self, scratch: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(scratch).await {
            tracing::warn!(dir = %scratch.display(), error = %e, "Could not remove scratch directory");
        }
    }
}
