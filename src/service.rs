use crate::{
    config::ProberConfig,
    sink::GrafanaSink,
    tasks::cycle::{CycleError, CycleTask},
};
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::{net::SocketAddr, sync::Arc};

/// Shared state for the prober service.
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<ProberConfig>,
    task: CycleTask,
    sink: GrafanaSink,
}

impl AppState {
    /// Build the service state from the prober configuration.
    pub fn new(config: Arc<ProberConfig>) -> Self {
        let task = CycleTask::new(&config);
        let sink = GrafanaSink::new(config.grafana.clone());
        Self { config, task, sink }
    }
}

/// Return a 404 Not Found response
pub async fn return_404() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

/// Return a 200 OK response
pub async fn return_200() -> Response {
    (StatusCode::OK, "ok").into_response()
}

/// Run one probe cycle for the requested blockchain and report a plaintext
/// summary. The scheduler hits this endpoint once per tick per region.
async fn run_probe(
    State(state): State<AppState>,
    Path(blockchain): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers, state.config.api_secret.as_deref()) {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }

    let registry = match state.config.registry() {
        Ok(registry) => registry,
        Err(err) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let providers = registry.providers_for(&blockchain);
    match state.task.run(&blockchain, providers, &state.sink).await {
        Ok(summary) => (
            StatusCode::OK,
            format!(
                "{} probe cycle completed: {} samples, {} ok, {} failed, pushed: {}",
                summary.blockchain, summary.total, summary.ok, summary.failed, summary.pushed
            ),
        )
            .into_response(),
        Err(err @ CycleError::NoProviders(_)) => {
            (StatusCode::NOT_FOUND, err.to_string()).into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

/// Bearer-token check against the configured secret. An unset secret
/// disables the check.
fn authorized(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret else { return true };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {secret}"))
}

/// Build the prober router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/probe/:blockchain", get(run_probe))
        .route("/healthcheck", get(return_200))
        .fallback(return_404)
        .with_state(state)
}

/// Serve the prober service on the given socket address.
pub fn serve_prober(
    socket: impl Into<SocketAddr>,
    config: Arc<ProberConfig>,
) -> tokio::task::JoinHandle<()> {
    let app = router(AppState::new(config));

    let addr = socket.into();
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app).await {
                    tracing::error!(%err, "serve failed");
                }
            }
            Err(err) => {
                tracing::error!(%err, "failed to bind to the address");
            }
        };
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_disabled_without_secret() {
        assert!(authorized(&HeaderMap::new(), None));
    }

    #[test]
    fn auth_requires_matching_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(!authorized(&headers, Some("s3cret")));

        headers.insert(header::AUTHORIZATION, "Bearer wrong".parse().unwrap());
        assert!(!authorized(&headers, Some("s3cret")));

        headers.insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        assert!(authorized(&headers, Some("s3cret")));
    }
}
