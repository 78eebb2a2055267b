//! Test utilities for exercising probes against in-process mock endpoints.
use crate::{
    config::{GrafanaConfig, ProberConfig},
    endpoints::EndpointDescriptor,
    sample::ProbeBatch,
    sink::{Ack, MetricsSink, PushError},
};
use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use eyre::Result;
use futures_util::{SinkExt, StreamExt};
use init4_bin_base::deps::tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt,
};
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Returns a prober config pointing at localhost with short timeouts.
pub fn setup_test_config() -> ProberConfig {
    ProberConfig {
        region: "test-region".into(),
        endpoints: r#"{"providers": []}"#.into(),
        request_timeout_ms: 1_000,
        cycle_deadline_ms: 5_000,
        prober_port: 8080,
        api_secret: None,
        grafana: GrafanaConfig {
            url: Url::parse("http://localhost:3000/api/push").unwrap(),
            user: "user".into(),
            api_key: "key".into(),
            push_timeout_ms: 1_000,
            push_retries: 1,
            push_retry_delay_ms: 10,
        },
    }
}

/// Initializes a logger that prints during testing
pub fn setup_logging() {
    // Initialize logging
    let filter = EnvFilter::from_default_env();
    let fmt = fmt::layer().with_filter(filter);
    let registry = registry().with(fmt);
    let _ = registry.try_init();
}

/// How a mock JSON-RPC HTTP endpoint should answer.
#[derive(Debug, Clone, Copy)]
pub enum MockRpcBehavior {
    /// Answer a valid JSON-RPC result after the given delay.
    Ok(Duration),
    /// Answer with the given HTTP status code and an empty body.
    Status(u16),
    /// Answer 200 with a body that is not JSON.
    Garbage,
}

/// Spawn a mock JSON-RPC HTTP endpoint with the given behavior. Returns the
/// bound address; the server runs until the test's runtime shuts down.
pub async fn mock_rpc_server(behavior: MockRpcBehavior) -> Result<SocketAddr> {
    let app = Router::new().route(
        "/",
        post(move || async move {
            match behavior {
                MockRpcBehavior::Ok(delay) => {
                    tokio::time::sleep(delay).await;
                    Json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"})).into_response()
                }
                MockRpcBehavior::Status(code) => {
                    let status =
                        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    (status, String::new()).into_response()
                }
                MockRpcBehavior::Garbage => (StatusCode::OK, "not json").into_response(),
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

/// How a mock WebSocket endpoint should behave after the handshake.
#[derive(Debug, Clone, Copy)]
pub enum MockWsBehavior {
    /// Answer the subscription request, echoing its id, after the delay.
    Reply(Duration),
    /// Drop the connection immediately after the handshake.
    DropAfterHandshake,
    /// Accept the request and never answer.
    Silent,
    /// Send two unrelated pushed messages, then the matching reply.
    NoiseThenReply,
    /// Answer with a frame that is not JSON.
    Garbage,
}

/// Spawn a mock WebSocket endpoint with the given behavior. Returns the
/// bound address.
pub async fn mock_ws_server(behavior: MockWsBehavior) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };

                if matches!(behavior, MockWsBehavior::DropAfterHandshake) {
                    return;
                }

                // Wait for the subscription request.
                let request_id = loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => {
                            let id = serde_json::from_str::<Value>(&text)
                                .ok()
                                .and_then(|v| v.get("id").and_then(Value::as_u64));
                            break id.unwrap_or(1);
                        }
                        Some(Ok(_)) => continue,
                        _ => return,
                    }
                };

                match behavior {
                    MockWsBehavior::Reply(delay) => {
                        tokio::time::sleep(delay).await;
                        let _ = ws.send(reply(request_id)).await;
                    }
                    MockWsBehavior::Silent => {
                        tokio::time::sleep(Duration::from_secs(600)).await;
                    }
                    MockWsBehavior::NoiseThenReply => {
                        for _ in 0..2 {
                            let noise = json!({
                                "jsonrpc": "2.0",
                                "method": "eth_subscription",
                                "params": {"subscription": "0xdead", "result": {}}
                            });
                            let _ = ws.send(Message::Text(noise.to_string())).await;
                        }
                        let _ = ws.send(reply(request_id)).await;
                    }
                    MockWsBehavior::Garbage => {
                        let _ = ws.send(Message::Text("not json".into())).await;
                    }
                    MockWsBehavior::DropAfterHandshake => {}
                }

                let _ = ws.close(None).await;
            });
        }
    });

    Ok(addr)
}

fn reply(id: u64) -> Message {
    Message::Text(json!({"jsonrpc": "2.0", "id": id, "result": "0xsub0"}).to_string())
}

/// Descriptor with only an HTTP endpoint at the given mock address.
pub fn http_descriptor(name: &str, addr: SocketAddr) -> EndpointDescriptor {
    EndpointDescriptor {
        blockchain: "Ethereum".into(),
        provider_name: name.into(),
        http_endpoint: Some(Url::parse(&format!("http://{addr}/")).unwrap()),
        websocket_endpoint: None,
        data: None,
    }
}

/// Descriptor with only a WebSocket endpoint at the given mock address.
pub fn ws_descriptor(name: &str, addr: SocketAddr) -> EndpointDescriptor {
    EndpointDescriptor {
        blockchain: "Ethereum".into(),
        provider_name: name.into(),
        http_endpoint: None,
        websocket_endpoint: Some(Url::parse(&format!("ws://{addr}/")).unwrap()),
        data: None,
    }
}

/// Sink that records every batch it is handed.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    batches: Arc<Mutex<Vec<ProbeBatch>>>,
}

impl RecordingSink {
    /// All batches pushed so far.
    pub fn batches(&self) -> Vec<ProbeBatch> {
        self.batches.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingSink {
    async fn push(&self, batch: &ProbeBatch) -> Result<Ack, PushError> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(Ack { accepted: batch.len() })
    }
}

/// Sink that always fails.
#[derive(Debug, Clone, Default)]
pub struct FailingSink;

impl MetricsSink for FailingSink {
    async fn push(&self, _batch: &ProbeBatch) -> Result<Ack, PushError> {
        Err(PushError::Status(502))
    }
}
