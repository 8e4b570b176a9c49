//! Subprocess execution for engines that shell out.
//!
//! [`run_process`] spawns a prepared [`Command`], writes a JSON payload to
//! its stdin, captures stdout and stderr, and enforces a timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::ComputeError;

/// Maximum stdout or stderr size captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was killed by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Run `cmd` to completion with `payload` as JSON on stdin.
///
/// The child is killed if `timeout` expires first.
pub async fn run_process<T: Serialize>(
    cmd: &mut Command,
    payload: &T,
    timeout: Duration,
) -> Result<ProcessOutput, ComputeError> {
    let input = serde_json::to_vec(payload)
        .map_err(|e| ComputeError::MalformedOutput(format!("cannot encode job: {e}")))?;

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        // The process may exit without reading its input.
        let _ = stdin.write_all(&input).await;
        drop(stdin);
    }

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();
            Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        Ok(Err(e)) => Err(ComputeError::Spawn(e)),
        // `child` is dropped here and killed.
        Err(_elapsed) => Err(ComputeError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        }),
    }
}

/// Capture up to [`MAX_OUTPUT_BYTES`] of a pipe, then drain the rest.
///
/// The pipe stays open until the child closes it, so a chatty child never
/// hits a broken pipe.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}
