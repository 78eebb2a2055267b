//! Default probe request payloads per blockchain.
//!
//! Chain-specific request payloads are configuration data: every probe sends
//! a lightweight read call appropriate for the target chain, and providers
//! may override it via the registry's `data` field.

use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

/// A JSON-RPC 2.0 request body for a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// Request id, used to correlate WebSocket responses.
    pub id: u64,
    /// JSON-RPC method name.
    pub method: String,
    /// Optional positional or named parameters.
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Create a request with a fresh correlation id.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self { id: next_id(), method: method.into(), params }
    }

    /// Serialize as a JSON-RPC 2.0 request object. `params` is omitted
    /// entirely when absent.
    pub fn to_json(&self) -> Value {
        let mut request = json!({
            "jsonrpc": "2.0",
            "id": self.id,
            "method": self.method,
        });
        if let Some(params) = &self.params {
            request["params"] = params.clone();
        }
        request
    }
}

fn next_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// The HTTP read call to time against a blockchain's providers.
///
/// An `override_call` from the registry takes precedence: a full call
/// description (`{"method": ..., "params": ...}`) is used verbatim, while
/// bare transaction data (`{"to": ..., "data": ...}`) becomes an `eth_call`
/// against the latest block.
pub fn http_call(blockchain: &str, override_call: Option<&Value>) -> RpcRequest {
    if let Some(value) = override_call {
        if let Some(method) = value.get("method").and_then(Value::as_str) {
            return RpcRequest::new(method.to_owned(), value.get("params").cloned());
        }
        if value.get("to").is_some() {
            return RpcRequest::new("eth_call", Some(json!([value, "latest"])));
        }
    }

    match blockchain.to_ascii_lowercase().as_str() {
        "solana" => RpcRequest::new("getSlot", None),
        "ton" => RpcRequest::new("getConsensusBlock", None),
        // EVM chains and anything unrecognized.
        _ => RpcRequest::new("eth_blockNumber", None),
    }
}

/// The subscription request used for a blockchain's WebSocket round trip.
pub fn ws_subscribe(blockchain: &str) -> RpcRequest {
    match blockchain.to_ascii_lowercase().as_str() {
        "solana" => RpcRequest::new("slotSubscribe", None),
        _ => RpcRequest::new("eth_subscribe", Some(json!(["newHeads"]))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_chain() {
        assert_eq!(http_call("Ethereum", None).method, "eth_blockNumber");
        assert_eq!(http_call("solana", None).method, "getSlot");
        assert_eq!(http_call("TON", None).method, "getConsensusBlock");
        assert_eq!(http_call("Base", None).method, "eth_blockNumber");

        assert_eq!(ws_subscribe("Ethereum").method, "eth_subscribe");
        assert_eq!(ws_subscribe("Solana").method, "slotSubscribe");
    }

    #[test]
    fn override_with_full_call_description() {
        let data = json!({"method": "eth_gasPrice"});
        let request = http_call("Ethereum", Some(&data));
        assert_eq!(request.method, "eth_gasPrice");
        assert_eq!(request.params, None);
    }

    #[test]
    fn override_with_tx_data_becomes_eth_call() {
        let data = json!({"to": "0x00000000000000000000000000000000deadbeef", "data": "0x"});
        let request = http_call("Ethereum", Some(&data));
        assert_eq!(request.method, "eth_call");
        let params = request.params.unwrap();
        assert_eq!(params[1], "latest");
        assert_eq!(params[0]["to"], "0x00000000000000000000000000000000deadbeef");
    }

    #[test]
    fn request_ids_are_unique() {
        let a = RpcRequest::new("eth_blockNumber", None);
        let b = RpcRequest::new("eth_blockNumber", None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn params_omitted_when_absent() {
        let body = RpcRequest::new("eth_blockNumber", None).to_json();
        assert!(body.get("params").is_none());
        assert_eq!(body["jsonrpc"], "2.0");
    }
}
