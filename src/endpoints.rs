//! Endpoint descriptors and the provider registry consumed by a probe cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The protocol used to reach a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Transport {
    /// One-shot request/response over HTTP(S).
    Http,
    /// Persistent, message-based connection over WS(S).
    WebSocket,
}

impl Transport {
    /// The label value attached to metric samples for this transport.
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One provider's endpoints for a single blockchain. Immutable for the
/// duration of a probe cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Blockchain network this provider serves.
    pub blockchain: String,

    /// Provider name, used as the `provider` metric label.
    #[serde(rename = "name")]
    pub provider_name: String,

    /// HTTP JSON-RPC endpoint, if the provider exposes one.
    #[serde(default)]
    pub http_endpoint: Option<Url>,

    /// WebSocket endpoint, if the provider exposes one.
    #[serde(default)]
    pub websocket_endpoint: Option<Url>,

    /// Optional probe request override. Either a full call description
    /// (`{"method": ..., "params": ...}`) or `eth_call` transaction data
    /// (`{"to": ..., "data": ...}`).
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl EndpointDescriptor {
    /// The transports this descriptor is configured for, in label order.
    pub fn transports(&self) -> Vec<Transport> {
        let mut transports = Vec::with_capacity(2);
        if self.http_endpoint.is_some() {
            transports.push(Transport::Http);
        }
        if self.websocket_endpoint.is_some() {
            transports.push(Transport::WebSocket);
        }
        transports
    }
}

/// Errors raised while loading the provider registry.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    /// The registry JSON could not be parsed.
    #[error("invalid endpoints JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A provider was configured with neither transport.
    #[error("provider {0} has neither an HTTP nor a WebSocket endpoint")]
    NoTransports(String),
}

/// The full set of configured providers, across all blockchains.
///
/// Deserialized from the `ENDPOINTS` JSON document:
/// `{"providers": [{"blockchain": ..., "name": ..., "http_endpoint": ...}, ...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointRegistry {
    /// All configured provider descriptors.
    #[serde(default)]
    pub providers: Vec<EndpointDescriptor>,
}

impl EndpointRegistry {
    /// Parse and validate a registry from its JSON representation.
    ///
    /// Descriptors with both transports absent are rejected here, before
    /// any probing starts.
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let registry: Self = serde_json::from_str(raw)?;
        for provider in &registry.providers {
            if provider.http_endpoint.is_none() && provider.websocket_endpoint.is_none() {
                return Err(RegistryError::NoTransports(provider.provider_name.clone()));
            }
        }
        Ok(registry)
    }

    /// Descriptors for one blockchain, matched case-insensitively.
    pub fn providers_for(&self, blockchain: &str) -> Vec<EndpointDescriptor> {
        self.providers
            .iter()
            .filter(|p| p.blockchain.eq_ignore_ascii_case(blockchain))
            .cloned()
            .collect()
    }

    /// Total number of configured providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry holds no providers at all.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registry_and_filters_by_blockchain() {
        let raw = r#"{
            "providers": [
                {"blockchain": "Ethereum", "name": "alpha", "http_endpoint": "https://alpha.example/rpc"},
                {"blockchain": "Ethereum", "name": "beta", "websocket_endpoint": "wss://beta.example/ws"},
                {"blockchain": "Solana", "name": "gamma", "http_endpoint": "https://gamma.example/rpc"}
            ]
        }"#;
        let registry = EndpointRegistry::from_json(raw).unwrap();
        assert_eq!(registry.len(), 3);

        let eth = registry.providers_for("ethereum");
        assert_eq!(eth.len(), 2);
        assert_eq!(eth[0].provider_name, "alpha");
        assert_eq!(eth[0].transports(), vec![Transport::Http]);
        assert_eq!(eth[1].transports(), vec![Transport::WebSocket]);

        assert!(registry.providers_for("ton").is_empty());
    }

    #[test]
    fn rejects_provider_without_any_transport() {
        let raw = r#"{"providers": [{"blockchain": "Ethereum", "name": "empty"}]}"#;
        let err = EndpointRegistry::from_json(raw).unwrap_err();
        assert!(matches!(err, RegistryError::NoTransports(name) if name == "empty"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            EndpointRegistry::from_json("not json"),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn transport_label_order_is_stable() {
        assert!(Transport::Http < Transport::WebSocket);
        assert_eq!(Transport::Http.as_label(), "http");
        assert_eq!(Transport::WebSocket.as_label(), "websocket");
    }
}
