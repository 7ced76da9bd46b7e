//! lineart-server binary: parse configuration, install logging, serve.

use clap::Parser;
use lineart_server::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config = ServerConfig::parse();
    let addr = config.socket_addr()?;
    let app = lineart_server::router(config.max_upload_bytes);

    info!("Starting server on http://{addr}");
    info!("Outline endpoint: POST http://{addr}/outline");
    info!("Coloring endpoints: POST http://{addr}/coloring_xdog, http://{addr}/coloring_hf");
    info!("Max upload size: {} bytes", config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    Ok(())
}
