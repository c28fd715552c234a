//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::recommender::CoreStatus;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" with a loaded catalog, "degraded" otherwise
    pub status: String,
    pub module: String,
    pub version: String,
    pub git_hash: String,
    pub tracks: usize,
    pub build_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let core = &state.core;
    let (status, reason) = match core.status() {
        CoreStatus::Ready => ("ok", None),
        CoreStatus::Unavailable(reason) => ("degraded", Some(reason.clone())),
    };
    Json(HealthResponse {
        status: status.to_string(),
        module: "mtune-rec".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        tracks: core.track_count(),
        build_id: core.manifest().map(|m| m.build_id),
        reason,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
