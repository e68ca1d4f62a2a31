//! Assistant HTTP server binary.
//!
//! Reads configuration from an optional TOML file (`MITHR_CONFIG`) plus
//! environment variables, starts the API server, and runs until ctrl-c.

use mithr::server::{ApiServer, AppState};
use mithr::AssistantConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AssistantConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "configuration failed");
        anyhow::anyhow!("configuration failed: {e}")
    })?;

    tracing::info!(
        "mithr-server starting (RAG endpoint: {})",
        config.rag.endpoint
    );

    let server = ApiServer::start(AppState::new(config))
        .await
        .map_err(|e| anyhow::anyhow!("server start failed: {e}"))?;

    tracing::info!("serving on http://{}", server.addr());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown();

    Ok(())
}
