//! One-shot HTTP JSON-RPC latency probe.

use crate::probe::{ProbeOutcome, RpcRequest};
use reqwest::Client;
use std::time::{Duration, Instant, SystemTime};
use tracing::trace;
use url::Url;

/// Performs one timed JSON-RPC call against an HTTP endpoint.
///
/// The measurement covers dispatch through full body receipt, since a slow
/// body is real latency. One attempt, one outcome; any retry policy lives
/// with the caller.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe with a hard per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { client: Client::new(), timeout }
    }

    /// Perform exactly one timed request.
    pub async fn probe(&self, endpoint: &Url, request: &RpcRequest) -> ProbeOutcome {
        let body = request.to_json();
        trace!(%endpoint, method = %request.method, "dispatching http probe");

        let start = Instant::now();
        let response = match self
            .client
            .post(endpoint.clone())
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return classify_error(err, start),
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return classify_error(err, start),
        };
        let elapsed = start.elapsed();

        if !status.is_success() {
            return ProbeOutcome::ProtocolError {
                reason: format!("unexpected status code {}", status.as_u16()),
            };
        }

        if let Err(err) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            return ProbeOutcome::ProtocolError {
                reason: format!("malformed response body: {err}"),
            };
        }

        ProbeOutcome::Success {
            latency_ms: elapsed.as_secs_f64() * 1_000.0,
            measured_at: SystemTime::now(),
        }
    }
}

/// Map a reqwest failure onto the probe taxonomy. Anything that is not a
/// timeout is a network-level failure for this purpose: the endpoint never
/// produced a usable response.
fn classify_error(err: reqwest::Error, start: Instant) -> ProbeOutcome {
    if err.is_timeout() {
        ProbeOutcome::Timeout { elapsed_ms: start.elapsed().as_secs_f64() * 1_000.0 }
    } else {
        ProbeOutcome::ConnectionError { reason: err.to_string() }
    }
}
