use rpc_prober::{
    probe::{HttpProbe, ProbeOutcome, payload},
    test_utils::{MockRpcBehavior, mock_rpc_server, setup_logging},
};
use std::time::Duration;
use url::Url;

fn url_for(addr: std::net::SocketAddr) -> Url {
    Url::parse(&format!("http://{addr}/")).unwrap()
}

#[tokio::test]
async fn measures_latency_close_to_server_delay() {
    setup_logging();
    let addr = mock_rpc_server(MockRpcBehavior::Ok(Duration::from_millis(100))).await.unwrap();

    let probe = HttpProbe::new(Duration::from_secs(2));
    let request = payload::http_call("Ethereum", None);
    let outcome = probe.probe(&url_for(addr), &request).await;

    let latency = outcome.latency_ms().expect("probe should succeed");
    assert!(latency >= 100.0, "latency {latency} below server delay");
    assert!(latency < 1_000.0, "latency {latency} implausibly high");
    assert_eq!(outcome.status(), "ok");
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    setup_logging();
    let addr = mock_rpc_server(MockRpcBehavior::Ok(Duration::from_millis(500))).await.unwrap();

    let probe = HttpProbe::new(Duration::from_millis(100));
    let request = payload::http_call("Ethereum", None);
    let outcome = probe.probe(&url_for(addr), &request).await;

    match outcome {
        ProbeOutcome::Timeout { elapsed_ms } => {
            assert!(elapsed_ms >= 100.0, "gave up after only {elapsed_ms}ms");
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn non_2xx_status_is_a_protocol_error() {
    setup_logging();
    let addr = mock_rpc_server(MockRpcBehavior::Status(503)).await.unwrap();

    let probe = HttpProbe::new(Duration::from_secs(2));
    let request = payload::http_call("Ethereum", None);
    let outcome = probe.probe(&url_for(addr), &request).await;

    match outcome {
        ProbeOutcome::ProtocolError { reason } => assert!(reason.contains("503"), "{reason}"),
        other => panic!("expected ProtocolError, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_protocol_error() {
    setup_logging();
    let addr = mock_rpc_server(MockRpcBehavior::Garbage).await.unwrap();

    let probe = HttpProbe::new(Duration::from_secs(2));
    let request = payload::http_call("Ethereum", None);
    let outcome = probe.probe(&url_for(addr), &request).await;

    assert!(matches!(outcome, ProbeOutcome::ProtocolError { .. }), "got {outcome:?}");
}

#[tokio::test]
async fn refused_connection_is_a_connection_error() {
    setup_logging();
    // Bind and drop to get a port nothing is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let probe = HttpProbe::new(Duration::from_secs(2));
    let request = payload::http_call("Ethereum", None);
    let outcome = probe.probe(&url_for(addr), &request).await;

    assert!(matches!(outcome, ProbeOutcome::ConnectionError { .. }), "got {outcome:?}");
}
