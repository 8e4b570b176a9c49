//! Result callback delivery with exponential-backoff retry.
//!
//! [`ResultReporter`] posts a [`ResultEnvelope`] as an HTML form to the
//! configured endpoint. Failed attempts are retried with delays of 1 s, 2 s,
//! 4 s and so on, up to the configured number of retries.

use std::time::Duration;

use qbench_core::benchmark::ResultEnvelope;

/// Longest delay between two attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-2xx status code.
    #[error("Callback returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ResultReporter
// ---------------------------------------------------------------------------

/// Posts result and error envelopes to the result endpoint.
#[derive(Debug, Clone)]
pub struct ResultReporter {
    client: reqwest::Client,
    url: String,
    retry_delays: Vec<Duration>,
}

/// Backoff schedule `1s, 2s, 4s, ...` with `retries` entries.
pub fn backoff_schedule(retries: usize) -> Vec<Duration> {
    (0..retries)
        .map(|attempt| {
            let secs = 1u64 << attempt.min(16);
            Duration::from_secs(secs).min(MAX_RETRY_DELAY)
        })
        .collect()
}

impl ResultReporter {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            retry_delays: backoff_schedule(max_retries),
        })
    }

    /// Replace the delays between attempts.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Deliver `envelope`, retrying on failure.
    ///
    /// Returns the error of the last attempt once all retries are spent.
    pub async fn report(&self, envelope: &ResultEnvelope) -> Result<(), CallbackError> {
        let fields = envelope.form_fields()?;
        let metrics_id = envelope.metrics_id();

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(&fields).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        metrics_id,
                        url = %self.url,
                        error = %e,
                        "Callback attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(&fields).await.inspect_err(|e| {
            tracing::error!(
                metrics_id,
                url = %self.url,
                error = %e,
                "Callback delivery failed after all retries"
            );
        })
    }

    async fn try_send(&self, fields: &[(&'static str, String)]) -> Result<(), CallbackError> {
        let response = self.client.post(&self.url).form(fields).send().await?;
        if !response.status().is_success() {
            return Err(CallbackError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
