use crate::endpoints::{EndpointRegistry, RegistryError};
use init4_bin_base::utils::from_env::FromEnv;
use std::time::Duration;

/// Default hard per-probe timeout, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default overall cycle deadline, in milliseconds. Kept well under the
/// one-minute scheduler tick to leave margin for the metrics push.
pub const DEFAULT_CYCLE_DEADLINE_MS: u64 = 45_000;

/// Configuration for a prober running in a specific region.
#[derive(Debug, Clone, FromEnv)]
pub struct ProberConfig {
    /// Region identifier attached to every sample this prober produces.
    #[from_env(
        var = "PROBE_REGION",
        desc = "Geographic region identifier attached to every metric sample",
        infallible
    )]
    pub region: String,

    /// Raw provider registry JSON. Parsed and validated via
    /// [`ProberConfig::registry`].
    #[from_env(
        var = "ENDPOINTS",
        desc = "Provider registry JSON: {\"providers\": [{\"blockchain\": ..., \"name\": ..., \"http_endpoint\": ..., \"websocket_endpoint\": ...}]}",
        infallible
    )]
    pub endpoints: String,

    /// Hard timeout for one probe attempt, in milliseconds.
    #[from_env(
        var = "REQUEST_TIMEOUT_MS",
        desc = "Hard per-probe timeout in milliseconds",
        default = 5_000
    )]
    pub request_timeout_ms: u64,

    /// Overall deadline for one probe cycle, in milliseconds. Probes still
    /// running at the deadline are abandoned and reported as timeouts.
    #[from_env(
        var = "CYCLE_DEADLINE_MS",
        desc = "Overall probe cycle deadline in milliseconds",
        default = 45_000
    )]
    pub cycle_deadline_ms: u64,

    /// Port for the prober service.
    #[from_env(var = "PROBER_PORT", desc = "Port for the prober service", default = 8080)]
    pub prober_port: u16,

    /// Bearer token required to trigger a probe cycle. Unset disables auth,
    /// for local development only.
    #[from_env(
        var = "API_SECRET",
        desc = "Bearer token required to trigger a probe cycle",
        infallible,
        optional
    )]
    pub api_secret: Option<String>,

    /// Metrics backend configuration.
    pub grafana: GrafanaConfig,
}

impl ProberConfig {
    /// Parse and validate the provider registry from the raw JSON.
    pub fn registry(&self) -> Result<EndpointRegistry, RegistryError> {
        EndpointRegistry::from_json(&self.endpoints)
    }

    /// The hard per-probe timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The overall cycle deadline.
    pub const fn cycle_deadline(&self) -> Duration {
        Duration::from_millis(self.cycle_deadline_ms)
    }
}

/// Configuration for the Grafana-hosted metrics ingestion endpoint.
#[derive(Debug, Clone, FromEnv)]
pub struct GrafanaConfig {
    /// Ingestion URL for line-protocol pushes.
    #[from_env(var = "GRAFANA_URL", desc = "Metrics backend ingestion URL")]
    pub url: url::Url,

    /// Basic auth user.
    #[from_env(var = "GRAFANA_USER", desc = "Metrics backend basic auth user", infallible)]
    pub user: String,

    /// Basic auth API key.
    #[from_env(var = "GRAFANA_API_KEY", desc = "Metrics backend API key", infallible)]
    pub api_key: String,

    /// Timeout for one push attempt, in milliseconds.
    #[from_env(
        var = "PUSH_TIMEOUT_MS",
        desc = "Timeout for one metrics push attempt in milliseconds",
        default = 10_000
    )]
    pub push_timeout_ms: u64,

    /// Maximum number of push attempts per batch.
    #[from_env(
        var = "PUSH_MAX_RETRIES",
        desc = "Maximum number of metrics push attempts per batch",
        default = 3
    )]
    pub push_retries: u32,

    /// Delay between push attempts, in milliseconds.
    #[from_env(
        var = "PUSH_RETRY_DELAY_MS",
        desc = "Delay between metrics push attempts in milliseconds",
        default = 10_000
    )]
    pub push_retry_delay_ms: u64,
}

impl GrafanaConfig {
    /// The per-attempt push timeout.
    pub const fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }

    /// The delay between push attempts.
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.push_retry_delay_ms)
    }
}
