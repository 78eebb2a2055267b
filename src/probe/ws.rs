//! WebSocket connect-subscribe-respond latency probe.

use crate::{
    metrics,
    probe::{ProbeOutcome, RpcRequest},
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::{Duration, Instant, SystemTime};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, trace};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Performs one timed connect + subscribe round trip against a WebSocket
/// endpoint.
///
/// The headline latency is the send-to-matching-response round trip, which
/// is what subscribers actually experience; handshake duration is recorded
/// separately as an ops metric. The connection is closed on every exit path.
#[derive(Debug, Clone)]
pub struct WsProbe {
    timeout: Duration,
}

impl WsProbe {
    /// Create a probe with a hard timeout applied to the handshake and to
    /// the message round trip independently.
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Perform exactly one connect-subscribe-respond-close sequence.
    pub async fn probe(&self, endpoint: &Url, request: &RpcRequest) -> ProbeOutcome {
        let handshake_start = Instant::now();
        let mut stream =
            match tokio::time::timeout(self.timeout, connect_async(endpoint.as_str())).await {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(err)) => {
                    return ProbeOutcome::ConnectionError { reason: err.to_string() };
                }
                Err(_) => {
                    return ProbeOutcome::ConnectionError {
                        reason: format!(
                            "handshake did not complete within {}ms",
                            self.timeout.as_millis()
                        ),
                    };
                }
            };
        let handshake_ms = handshake_start.elapsed().as_secs_f64() * 1_000.0;
        metrics::ws_handshake_duration_ms().record(handshake_ms);
        trace!(%endpoint, handshake_ms, "websocket handshake complete");

        let text = request.to_json().to_string();
        let start = Instant::now();
        let outcome = match stream.send(Message::Text(text)).await {
            Ok(()) => self.await_response(&mut stream, request.id, start).await,
            Err(err) => ProbeOutcome::ConnectionError { reason: err.to_string() },
        };

        // Best-effort close; the measurement is already taken.
        if let Err(err) = stream.close(None).await {
            debug!(%endpoint, %err, "error closing websocket");
        }

        outcome
    }

    /// Wait for the message whose id matches our request, discarding
    /// unrelated pushed messages rather than mis-measuring against them.
    async fn await_response(
        &self,
        stream: &mut WsStream,
        request_id: u64,
        start: Instant,
    ) -> ProbeOutcome {
        loop {
            let elapsed_ms = start.elapsed().as_secs_f64() * 1_000.0;
            let Some(remaining) = self.timeout.checked_sub(start.elapsed()) else {
                return ProbeOutcome::Timeout { elapsed_ms };
            };

            let message = match tokio::time::timeout(remaining, stream.next()).await {
                Err(_) => {
                    return ProbeOutcome::Timeout {
                        elapsed_ms: start.elapsed().as_secs_f64() * 1_000.0,
                    };
                }
                Ok(None) => {
                    return ProbeOutcome::ConnectionError {
                        reason: "connection closed before a response arrived".into(),
                    };
                }
                Ok(Some(Err(err))) => {
                    return ProbeOutcome::ConnectionError { reason: err.to_string() };
                }
                Ok(Some(Ok(message))) => message,
            };

            match message {
                Message::Text(text) => {
                    let value: Value = match serde_json::from_str(&text) {
                        Ok(value) => value,
                        Err(err) => {
                            return ProbeOutcome::ProtocolError {
                                reason: format!("malformed message: {err}"),
                            };
                        }
                    };

                    // Anything without our id is an unrelated push.
                    if value.get("id").and_then(Value::as_u64) != Some(request_id) {
                        trace!("discarding unrelated websocket message");
                        continue;
                    }

                    if let Some(error) = value.get("error") {
                        return ProbeOutcome::ProtocolError {
                            reason: format!("subscription rejected: {error}"),
                        };
                    }
                    if value.get("result").is_none_or(Value::is_null) {
                        return ProbeOutcome::ProtocolError {
                            reason: "subscription response carried no result".into(),
                        };
                    }

                    return ProbeOutcome::Success {
                        latency_ms: start.elapsed().as_secs_f64() * 1_000.0,
                        measured_at: SystemTime::now(),
                    };
                }
                Message::Close(_) => {
                    return ProbeOutcome::ConnectionError {
                        reason: "connection closed before a response arrived".into(),
                    };
                }
                // Control and binary frames are not our response.
                _ => continue,
            }
        }
    }
}
