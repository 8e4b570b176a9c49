//! Engine backed by the `quantmark` Python library.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use qbench_core::benchmark::{BenchmarkJob, BenchmarkResult};
use serde::Deserialize;
use tokio::process::Command;

use super::process::{run_process, ProcessOutput};
use super::{BenchmarkEngine, ComputeError};
use crate::config::WorkerConfig;

/// Driver shipped with the worker, run with `python -c`.
const BUNDLED_DRIVER: &str = include_str!("quantmark_driver.py");

/// Bytes of stderr kept in a [`ComputeError::Failed`].
const STDERR_TAIL_BYTES: usize = 2048;

/// The single line the driver writes to stdout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DriverReply {
    Ok(BenchmarkResult),
    Error(String),
}

/// Runs each benchmark in a fresh Python process.
#[derive(Debug, Clone)]
pub struct QuantmarkEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl QuantmarkEngine {
    /// Engine running `program args...` with the job on stdin.
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        let args = match &config.driver {
            Some(path) => vec![path.to_string_lossy().into_owned()],
            None => vec!["-c".to_string(), BUNDLED_DRIVER.to_string()],
        };
        Self::new(
            config.python.clone(),
            args,
            Duration::from_secs(config.task_timeout_secs),
        )
    }
}

#[async_trait]
impl BenchmarkEngine for QuantmarkEngine {
    async fn run(
        &self,
        job: &BenchmarkJob,
        work_dir: &Path,
    ) -> Result<BenchmarkResult, ComputeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(work_dir);

        let output = run_process(&mut cmd, job, self.timeout).await?;
        tracing::debug!(
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            "Benchmark process finished"
        );
        interpret(output)
    }
}

/// Turn the driver's output into a result.
///
/// The reply is the last non-empty stdout line; anything printed before it
/// is library noise.
fn interpret(output: ProcessOutput) -> Result<BenchmarkResult, ComputeError> {
    let reply = output
        .stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<DriverReply>(line.trim()));

    match reply {
        Some(Ok(DriverReply::Ok(result))) => Ok(result),
        Some(Ok(DriverReply::Error(message))) => Err(ComputeError::Library(message)),
        _ if output.exit_code != 0 => Err(ComputeError::Failed {
            exit_code: output.exit_code,
            stderr: tail(&output.stderr, STDERR_TAIL_BYTES),
        }),
        Some(Err(e)) => Err(ComputeError::MalformedOutput(e.to_string())),
        None => Err(ComputeError::MalformedOutput("no reply on stdout".into())),
    }
}

fn tail(text: &str, max_bytes: usize) -> String {
    let text = text.trim_end();
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
