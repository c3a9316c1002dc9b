//! `thakii-health` binary: serves `/health` and `/` until SIGINT or SIGTERM.
//!
//! ```text
//! HEALTH_HOST=127.0.0.1 HEALTH_PORT=9000 RUST_LOG=debug thakii-health
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use thakii_health::config::DEFAULT_LOG_FILTER;
use thakii_health::{Config, HealthService, Router, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("invalid configuration")?;
    let service = Arc::new(HealthService::from_config(&config));

    let addr = config.bind_addr();
    let server = Server::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        host = %config.host,
        port = config.port,
        dependencies = ?service.dependencies().names().collect::<Vec<_>>(),
        "health check server starting"
    );
    info!("health endpoint: http://{addr}/health");
    info!("info endpoint: http://{addr}/");

    server.serve(Router::new(service)).await?;
    Ok(())
}
