use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when every dependency answers, `degraded` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub store_healthy: bool,
    pub cache_healthy: bool,
}

/// GET /health -- returns service, store and cache health.
///
/// A broken cache only degrades the service; reads fall through to the store.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.catalog.health().await;

    let status = if report.store_healthy && report.cache_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store_healthy: report.store_healthy,
        cache_healthy: report.cache_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
