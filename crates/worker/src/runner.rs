//! The worker's consume loop.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broker::TaskSource;
use crate::celery;
use crate::task::TaskHandler;

/// Delay before asking a failed source for messages again.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Counters reported when the loop stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Benchmark tasks handled.
    pub processed: usize,
    /// Messages dropped as undecodable.
    pub rejected: usize,
}

/// Pulls tasks from a source and handles them strictly one at a time.
pub struct Worker<S> {
    source: S,
    handler: TaskHandler,
    reconnect_delay: Duration,
}

impl<S: TaskSource> Worker<S> {
    pub fn new(source: S, handler: TaskHandler) -> Self {
        Self {
            source,
            handler,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run until `cancel` fires or the source is exhausted.
    ///
    /// Cancellation is only observed between tasks; a running benchmark is
    /// always finished and reported.
    pub async fn run(mut self, cancel: CancellationToken) -> RunSummary {
        let mut summary = RunSummary::default();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker cancelled");
                    break;
                }
                next = self.source.next() => next,
            };

            let message = match next {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!("Task source exhausted");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Task source failed, reconnecting");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                    continue;
                }
            };

            match celery::decode(&message) {
                Ok(invocation) => {
                    tracing::debug!(task_id = ?invocation.id, "Received benchmark task");
                    self.handler.handle(invocation.request).await;
                    summary.processed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        task = ?message.task,
                        task_id = ?message.id,
                        error = %e,
                        "Dropping undecodable message"
                    );
                    summary.rejected += 1;
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            rejected = summary.rejected,
            "Worker stopped"
        );
        summary
    }
}
