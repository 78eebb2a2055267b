//! Probe cycle orchestration: fan out, join, build the batch, push.

use crate::{
    config::ProberConfig,
    endpoints::{EndpointDescriptor, RegistryError, Transport},
    metrics,
    probe::{HttpProbe, ProbeOutcome, WsProbe, payload},
    sample::{MetricSample, ProbeBatch},
    sink::MetricsSink,
};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::{task::JoinSet, time::timeout_at};
use tracing::{debug, error, info, instrument, warn};

/// Cycle-level failures. Probe-level failures never surface here; they are
/// converted to failure samples inside the batch.
#[derive(thiserror::Error, Debug)]
pub enum CycleError {
    /// No providers are configured for the requested blockchain.
    #[error("no providers configured for blockchain {0}")]
    NoProviders(String),

    /// The provider registry itself is invalid.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// What one cycle accomplished.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// Blockchain that was probed.
    pub blockchain: String,
    /// Total samples in the batch.
    pub total: usize,
    /// Samples with `status="ok"`.
    pub ok: usize,
    /// Samples with any failure status.
    pub failed: usize,
    /// Whether the batch reached the backend.
    pub pushed: bool,
}

/// Runs one probe cycle: every configured (provider, transport) pair is
/// probed concurrently, every outcome becomes a sample, and the finished
/// batch is handed to the sink once.
#[derive(Debug, Clone)]
pub struct CycleTask {
    region: String,
    http: HttpProbe,
    ws: WsProbe,
    deadline: Duration,
}

impl CycleTask {
    /// Build a cycle task from the prober configuration.
    pub fn new(config: &ProberConfig) -> Self {
        Self {
            region: config.region.clone(),
            http: HttpProbe::new(config.request_timeout()),
            ws: WsProbe::new(config.request_timeout()),
            deadline: config.cycle_deadline(),
        }
    }

    /// Run one cycle for `blockchain` and hand the batch to `sink`.
    ///
    /// One provider's failure never affects another's result; only an empty
    /// provider list aborts the cycle. A failed push is surfaced in the
    /// summary but does not invalidate the measurements already taken.
    #[instrument(skip_all, fields(blockchain = %blockchain, providers = providers.len()))]
    pub async fn run<S: MetricsSink>(
        &self,
        blockchain: &str,
        providers: Vec<EndpointDescriptor>,
        sink: &S,
    ) -> Result<CycleSummary, CycleError> {
        if providers.is_empty() {
            return Err(CycleError::NoProviders(blockchain.to_owned()));
        }

        let started = Instant::now();
        let batch = self.collect(blockchain, &providers).await;
        metrics::cycles_run().increment(1);
        metrics::cycle_duration_ms().record(started.elapsed().as_secs_f64() * 1_000.0);

        let pushed = match sink.push(&batch).await {
            Ok(ack) => {
                debug!(accepted = ack.accepted, "batch pushed");
                true
            }
            Err(err) => {
                metrics::push_failures().increment(1);
                error!(%err, "metrics push failed");
                false
            }
        };

        let summary = CycleSummary {
            blockchain: blockchain.to_owned(),
            total: batch.len(),
            ok: batch.ok_count(),
            failed: batch.len() - batch.ok_count(),
            pushed,
        };
        info!(
            total = summary.total,
            ok = summary.ok,
            failed = summary.failed,
            pushed,
            "probe cycle complete"
        );
        Ok(summary)
    }

    /// Fan out one probe per configured (provider, transport) pair and join
    /// them under the cycle deadline. Always returns a batch covering every
    /// pair; pairs still in flight at the deadline are abandoned and
    /// reported as timeouts.
    async fn collect(&self, blockchain: &str, providers: &[EndpointDescriptor]) -> ProbeBatch {
        let mut probes: JoinSet<(usize, Transport, ProbeOutcome)> = JoinSet::new();
        let mut expected: Vec<(usize, Transport)> = Vec::new();

        for (idx, provider) in providers.iter().enumerate() {
            if let Some(url) = &provider.http_endpoint {
                let probe = self.http.clone();
                let url = url.clone();
                let request = payload::http_call(blockchain, provider.data.as_ref());
                expected.push((idx, Transport::Http));
                probes.spawn(async move {
                    (idx, Transport::Http, probe.probe(&url, &request).await)
                });
            }
            if let Some(url) = &provider.websocket_endpoint {
                let probe = self.ws.clone();
                let url = url.clone();
                let request = payload::ws_subscribe(blockchain);
                expected.push((idx, Transport::WebSocket));
                probes.spawn(async move {
                    (idx, Transport::WebSocket, probe.probe(&url, &request).await)
                });
            }
        }

        let deadline = tokio::time::Instant::now() + self.deadline;
        let mut outcomes: HashMap<(usize, Transport), ProbeOutcome> =
            HashMap::with_capacity(expected.len());
        while !probes.is_empty() {
            match timeout_at(deadline, probes.join_next()).await {
                Ok(Some(Ok((idx, transport, outcome)))) => {
                    outcomes.insert((idx, transport), outcome);
                }
                Ok(Some(Err(join_err))) => {
                    // The pair is backfilled below; the probe itself is gone.
                    warn!(%join_err, "probe task did not complete");
                }
                Ok(None) => break,
                Err(_) => {
                    // Deadline hit. Aborted probes drop their futures, which
                    // closes any sockets they still hold.
                    warn!(abandoned = probes.len(), "cycle deadline reached");
                    probes.abort_all();
                    break;
                }
            }
        }

        let deadline_ms = self.deadline.as_secs_f64() * 1_000.0;
        let samples = expected
            .into_iter()
            .map(|(idx, transport)| {
                let outcome = outcomes
                    .remove(&(idx, transport))
                    .unwrap_or(ProbeOutcome::Timeout { elapsed_ms: deadline_ms });
                if !outcome.is_ok() {
                    metrics::probe_failures().increment(1);
                    warn!(
                        provider = %providers[idx].provider_name,
                        %transport,
                        status = outcome.status(),
                        "probe failed"
                    );
                }
                MetricSample::from_outcome(&outcome, &providers[idx], &self.region, transport)
            })
            .collect();

        ProbeBatch::new(samples)
    }
}
