use anyhow::{Context, Result};
use tracing::info;

use crate::observability::metrics::get_metrics;
use crate::observability::routes::MetricsState;

/// Serve `/metrics` and `/healthz` on `listen` until the process exits.
pub async fn start(listen: &str) -> Result<()> {
    let metrics = get_metrics().await;
    let app = MetricsState::new(metrics.registry.clone()).router();

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("unable to bind metrics listener on {}", listen))?;
    info!(address = %listen, "metrics endpoint listening");
    metrics.up.set(1);
    axum::serve(listener, app).await.context("metrics server failed")?;

    Ok(())
}
