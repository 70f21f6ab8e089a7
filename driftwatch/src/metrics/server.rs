//! Metrics HTTP server

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::collector::MetricsCollector;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub struct ServerConfig {
    pub listen_address: String,
    pub metrics_path: String,
    pub health_check_path: String,
}

/// Serves the metrics and health endpoints until the token is canceled.
pub async fn run_server(
    config: ServerConfig,
    collector: Arc<MetricsCollector>,
    cancel: CancellationToken,
) -> Result<()> {
    let app = Router::new()
        .route(&config.metrics_path, get(serve_metrics))
        .route(&config.health_check_path, get(health_check))
        .with_state(collector);

    let listener = tokio::net::TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("could not listen on {}", config.listen_address))?;

    info!("Metrics server listening on {}", config.listen_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("metrics server failed")
}

async fn serve_metrics(State(collector): State<Arc<MetricsCollector>>) -> impl IntoResponse {
    match collector.collect().await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(err) => {
            error!("Could not collect drift metrics: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
