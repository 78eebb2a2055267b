use rpc_prober::{
    service::{AppState, router},
    test_utils::{MockRpcBehavior, mock_rpc_server, setup_logging, setup_test_config},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};

async fn serve(config: rpc_prober::ProberConfig) -> SocketAddr {
    let app = router(AppState::new(Arc::new(config)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

#[tokio::test]
async fn healthcheck_is_open_and_unknown_routes_404() {
    setup_logging();
    let addr = serve(setup_test_config()).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("http://{addr}/healthcheck")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client.get(format!("http://{addr}/nope")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn probe_endpoint_requires_the_bearer_token() {
    setup_logging();
    let mut config = setup_test_config();
    config.api_secret = Some("s3cret".into());
    let addr = serve(config).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("http://{addr}/probe/Ethereum")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Wrong token is also rejected.
    let response = client
        .get(format!("http://{addr}/probe/Ethereum"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn probe_endpoint_runs_a_cycle_and_reports_counts() {
    setup_logging();
    let rpc_addr =
        mock_rpc_server(MockRpcBehavior::Ok(Duration::from_millis(10))).await.unwrap();

    let mut config = setup_test_config();
    config.api_secret = Some("s3cret".into());
    config.endpoints = format!(
        r#"{{"providers": [{{"blockchain": "Ethereum", "name": "alpha", "http_endpoint": "http://{rpc_addr}/"}}]}}"#
    );
    // The push target is unreachable; the cycle must still complete.
    let addr = serve(config).await;

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/probe/Ethereum"))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("1 samples"), "{body}");
    assert!(body.contains("1 ok"), "{body}");
}

#[tokio::test]
async fn unconfigured_blockchain_is_a_404() {
    setup_logging();
    let addr = serve(setup_test_config()).await;

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/probe/Ethereum"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body = response.text().await.unwrap();
    assert!(body.contains("no providers configured"), "{body}");
}
