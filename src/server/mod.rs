// HTTP front end
// JSON endpoints over the orchestrator: POST /query and GET /health


use anyhow::Context;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::{Orchestrator, ResolutionResult};

/// Body of `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Routes over a shared orchestrator
#[inline]
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .with_state(orchestrator)
}

/// Serve on `server.bind` until the process is stopped
#[inline]
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let orchestrator = Arc::new(Orchestrator::from_config(config)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(address = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, router(orchestrator))
        .await
        .context("HTTP server stopped unexpectedly")?;
    Ok(())
}

async fn handle_query(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<QueryRequest>,
) -> Json<ResolutionResult> {
    Json(orchestrator.respond(&request.query).await)
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
