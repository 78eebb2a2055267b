use init4_bin_base::{deps::tracing::info, utils::from_env::FromEnv};
use rpc_prober::{config::ProberConfig, service::serve_prober};
use std::sync::Arc;

// Note: Must be set to `multi_thread` to support async tasks.
// See: https://docs.rs/tokio/latest/tokio/attr.main.html
#[tokio::main(flavor = "multi_thread")]
async fn main() -> eyre::Result<()> {
    let _guard = init4_bin_base::init4();

    // Pull the configuration from the environment
    let config = Arc::new(ProberConfig::from_env()?);

    // Fail fast on a malformed registry instead of on the first cycle
    let registry = config.registry()?;
    info!(providers = registry.len(), region = %config.region, "endpoint registry loaded");

    let server = serve_prober(([0, 0, 0, 0], config.prober_port), config.clone());
    server.await?;

    info!("shutting down");

    Ok(())
}
