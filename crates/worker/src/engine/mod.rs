//! Boundary to the external VQE benchmark library.
//!
//! The worker never links the library; it talks to it through a
//! [`BenchmarkEngine`]. [`QuantmarkEngine`] is the production engine, a
//! Python subprocess driving `quantmark`.

pub mod process;
pub mod quantmark;

use std::path::Path;

use async_trait::async_trait;
use qbench_core::benchmark::{BenchmarkJob, BenchmarkResult, ComputeFailure};

pub use quantmark::QuantmarkEngine;

/// Why the benchmark library produced no result.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Failed to start benchmark process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Benchmark timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Benchmark process exited with code {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    /// The library raised; carries its message, possibly empty.
    #[error("{0}")]
    Library(String),

    #[error("Unreadable benchmark output: {0}")]
    MalformedOutput(String),
}

impl From<ComputeError> for ComputeFailure {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Library(message) => ComputeFailure::new(message),
            other => ComputeFailure::new(other.to_string()),
        }
    }
}

/// Runs one VQE benchmark.
#[async_trait]
pub trait BenchmarkEngine: Send + Sync {
    /// Run `job` with `work_dir` as the library's working directory.
    async fn run(&self, job: &BenchmarkJob, work_dir: &Path)
        -> Result<BenchmarkResult, ComputeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_messages_become_the_failure_reason() {
        let failure = ComputeFailure::from(ComputeError::Library("unknown basis set".into()));
        assert_eq!(failure.reason, "unknown basis set");
    }

    #[test]
    fn silent_library_failures_get_the_generic_reason() {
        let failure = ComputeFailure::from(ComputeError::Library(String::new()));
        assert_eq!(failure.reason, "computation failed");
    }

    #[test]
    fn process_failures_keep_their_description() {
        let failure = ComputeFailure::from(ComputeError::Timeout { elapsed_ms: 1500 });
        assert_eq!(failure.reason, "Benchmark timed out after 1500ms");
    }
}
