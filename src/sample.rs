//! Metric samples and the per-cycle batch.

use crate::{
    endpoints::{EndpointDescriptor, Transport},
    probe::ProbeOutcome,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the latency metric pushed to the backend.
pub const LATENCY_METRIC: &str = "rpc_response_latency_ms";

/// Wire value for samples whose probe failed. Never 0, so a failure can not
/// be mistaken for a fast response.
pub const FAILURE_SENTINEL: f64 = -1.0;

/// The fixed label set attached to every sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLabels {
    /// Blockchain network that was probed.
    pub blockchain: String,
    /// Provider name.
    pub provider: String,
    /// Region the probe executed in.
    pub region: String,
    /// Transport the probe used.
    pub transport: Transport,
    /// Probe outcome status: `ok`, `timeout`, `connection_error` or
    /// `protocol_error`.
    pub status: &'static str,
}

/// One labeled data point, produced from exactly one probe outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Metric name.
    pub metric_name: &'static str,
    /// Measured latency in milliseconds; `None` for failed probes.
    pub value: Option<f64>,
    /// Label set.
    pub labels: SampleLabels,
    /// When the measurement was taken.
    pub timestamp: SystemTime,
}

impl MetricSample {
    /// Build a sample from a probe outcome. Pure apart from timestamping
    /// failure samples, which carry no measurement time of their own.
    pub fn from_outcome(
        outcome: &ProbeOutcome,
        descriptor: &EndpointDescriptor,
        region: &str,
        transport: Transport,
    ) -> Self {
        let (value, timestamp) = match outcome {
            ProbeOutcome::Success { latency_ms, measured_at } => {
                (Some(*latency_ms), *measured_at)
            }
            _ => (None, SystemTime::now()),
        };

        Self {
            metric_name: LATENCY_METRIC,
            value,
            labels: SampleLabels {
                blockchain: descriptor.blockchain.clone(),
                provider: descriptor.provider_name.clone(),
                region: region.to_owned(),
                transport,
                status: outcome.status(),
            },
            timestamp,
        }
    }

    /// Render as an Influx line protocol record:
    /// `measurement,tag=value,... value=<f64> <ns-timestamp>`.
    pub fn to_line_protocol(&self) -> String {
        let nanos = self
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        format!(
            "{},blockchain={},provider={},region={},transport={},status={} value={} {}",
            self.metric_name,
            escape_tag(&self.labels.blockchain),
            escape_tag(&self.labels.provider),
            escape_tag(&self.labels.region),
            self.labels.transport.as_label(),
            self.labels.status,
            self.value.unwrap_or(FAILURE_SENTINEL),
            nanos,
        )
    }
}

/// Tag values must escape spaces, commas and equals signs in line protocol.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ' ' | ',' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// All samples produced by one probe cycle for one blockchain, in a
/// deterministic (provider, transport) order. Built once, never mutated
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProbeBatch {
    samples: Vec<MetricSample>,
}

impl ProbeBatch {
    /// Build a batch, sorting samples by provider name then transport so the
    /// output is diff-stable regardless of probe completion order.
    pub fn new(mut samples: Vec<MetricSample>) -> Self {
        samples.sort_by(|a, b| {
            a.labels
                .provider
                .cmp(&b.labels.provider)
                .then(a.labels.transport.cmp(&b.labels.transport))
        });
        Self { samples }
    }

    /// The ordered samples.
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the batch holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples whose probe succeeded.
    pub fn ok_count(&self) -> usize {
        self.samples.iter().filter(|s| s.labels.status == "ok").count()
    }

    /// Render the whole batch as newline-separated line protocol.
    pub fn to_line_protocol(&self) -> String {
        self.samples
            .iter()
            .map(MetricSample::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn descriptor(provider: &str) -> EndpointDescriptor {
        EndpointDescriptor {
            blockchain: "Ethereum".into(),
            provider_name: provider.into(),
            http_endpoint: Some(Url::parse("http://localhost:1/").unwrap()),
            websocket_endpoint: Some(Url::parse("ws://localhost:1/").unwrap()),
            data: None,
        }
    }

    #[test]
    fn success_sample_carries_latency_and_ok_status() {
        let outcome =
            ProbeOutcome::Success { latency_ms: 12.5, measured_at: SystemTime::now() };
        let sample =
            MetricSample::from_outcome(&outcome, &descriptor("alpha"), "iad1", Transport::Http);
        assert_eq!(sample.value, Some(12.5));
        assert_eq!(sample.labels.status, "ok");
        assert_eq!(sample.labels.provider, "alpha");
        assert_eq!(sample.labels.region, "iad1");
    }

    #[test]
    fn failure_sample_uses_sentinel_never_zero() {
        let outcome = ProbeOutcome::Timeout { elapsed_ms: 500.0 };
        let sample = MetricSample::from_outcome(
            &outcome,
            &descriptor("alpha"),
            "iad1",
            Transport::WebSocket,
        );
        assert_eq!(sample.value, None);
        assert_eq!(sample.labels.status, "timeout");

        let line = sample.to_line_protocol();
        assert!(line.contains("value=-1 "));
        assert!(line.contains("status=timeout"));
        assert!(line.contains("transport=websocket"));
    }

    #[test]
    fn line_protocol_escapes_tag_values() {
        let mut desc = descriptor("my provider,inc");
        desc.blockchain = "Test=Chain".into();
        let outcome =
            ProbeOutcome::Success { latency_ms: 1.0, measured_at: SystemTime::now() };
        let sample = MetricSample::from_outcome(&outcome, &desc, "iad1", Transport::Http);
        let line = sample.to_line_protocol();
        assert!(line.contains(r"provider=my\ provider\,inc"));
        assert!(line.contains(r"blockchain=Test\=Chain"));
    }

    #[test]
    fn batch_orders_by_provider_then_transport() {
        let now = SystemTime::now();
        let outcome = ProbeOutcome::Success { latency_ms: 1.0, measured_at: now };
        let samples = vec![
            MetricSample::from_outcome(&outcome, &descriptor("beta"), "r", Transport::WebSocket),
            MetricSample::from_outcome(&outcome, &descriptor("alpha"), "r", Transport::WebSocket),
            MetricSample::from_outcome(&outcome, &descriptor("beta"), "r", Transport::Http),
            MetricSample::from_outcome(&outcome, &descriptor("alpha"), "r", Transport::Http),
        ];
        let batch = ProbeBatch::new(samples);
        let order: Vec<_> = batch
            .samples()
            .iter()
            .map(|s| (s.labels.provider.as_str(), s.labels.transport))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha", Transport::Http),
                ("alpha", Transport::WebSocket),
                ("beta", Transport::Http),
                ("beta", Transport::WebSocket),
            ]
        );
        assert_eq!(batch.ok_count(), 4);
    }
}
