//! Push contract for the remote metrics backend.

use crate::{config::GrafanaConfig, sample::ProbeBatch};
use reqwest::Client;
use std::future::Future;
use tracing::{debug, warn};

/// Acknowledgement of a successful push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Number of samples the backend accepted.
    pub accepted: usize,
}

/// Errors raised while pushing a batch.
#[derive(thiserror::Error, Debug)]
pub enum PushError {
    /// The backend answered with a non-success status.
    #[error("metrics backend returned status {0}")]
    Status(u16),

    /// The backend could not be reached.
    #[error("error contacting metrics backend: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Receives one finished batch per cycle. A push failure is surfaced to the
/// caller but never invalidates the measurements already taken.
pub trait MetricsSink: Send + Sync {
    /// Push one batch to the backend.
    fn push(&self, batch: &ProbeBatch) -> impl Future<Output = Result<Ack, PushError>> + Send;
}

/// Pushes batches to a Grafana-hosted ingestion endpoint as Influx line
/// protocol over HTTP basic auth.
///
/// Retries are internal to the sink and bounded by configuration; the
/// orchestrator itself never retries a push.
#[derive(Debug, Clone)]
pub struct GrafanaSink {
    client: Client,
    config: GrafanaConfig,
}

impl GrafanaSink {
    /// Create a sink from the backend configuration.
    pub fn new(config: GrafanaConfig) -> Self {
        Self { client: Client::new(), config }
    }
}

impl MetricsSink for GrafanaSink {
    async fn push(&self, batch: &ProbeBatch) -> Result<Ack, PushError> {
        if batch.is_empty() {
            return Ok(Ack { accepted: 0 });
        }

        let body = batch.to_line_protocol();
        let attempts = self.config.push_retries.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .post(self.config.url.clone())
                .basic_auth(&self.config.user, Some(&self.config.api_key))
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .timeout(self.config.push_timeout())
                .body(body.clone())
                .send()
                .await;

            let err = match result {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt, samples = batch.len(), "pushed batch to backend");
                    return Ok(Ack { accepted: batch.len() });
                }
                Ok(response) => PushError::Status(response.status().as_u16()),
                Err(err) => err.into(),
            };

            if attempt >= attempts {
                return Err(err);
            }
            warn!(attempt, %err, "push attempt failed, retrying");
            tokio::time::sleep(self.config.retry_delay()).await;
        }
    }
}
