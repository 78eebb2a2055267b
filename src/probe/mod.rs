/// HTTP latency probe
pub mod http;

/// Probe request payload tables
pub mod payload;

/// WebSocket latency probe
pub mod ws;

pub use http::HttpProbe;
pub use payload::RpcRequest;
pub use ws::WsProbe;

use std::time::SystemTime;

/// The result of one timed network operation against one endpoint over one
/// transport. Exactly one outcome is produced per (descriptor, transport)
/// pair per cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The probe completed and measured a round trip.
    Success {
        /// Wall-clock round trip in milliseconds.
        latency_ms: f64,
        /// When the measurement completed.
        measured_at: SystemTime,
    },

    /// The endpoint did not answer within the configured timeout.
    Timeout {
        /// Time spent waiting before giving up, in milliseconds.
        elapsed_ms: f64,
    },

    /// The endpoint could not be reached (DNS, refused, TLS, dropped).
    ConnectionError {
        /// Human-readable failure description.
        reason: String,
    },

    /// The endpoint answered, but not with a usable response.
    ProtocolError {
        /// Human-readable failure description.
        reason: String,
    },
}

impl ProbeOutcome {
    /// The `status` label value for this outcome.
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "ok",
            Self::Timeout { .. } => "timeout",
            Self::ConnectionError { .. } => "connection_error",
            Self::ProtocolError { .. } => "protocol_error",
        }
    }

    /// Whether the probe measured a latency.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The measured latency, if the probe succeeded.
    pub const fn latency_ms(&self) -> Option<f64> {
        match self {
            Self::Success { latency_ms, .. } => Some(*latency_ms),
            _ => None,
        }
    }
}
