//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when no model is loaded
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_loaded: bool,
    /// Variant of the loaded model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        status: if state.model.is_some() { "ok" } else { "degraded" }.to_string(),
        module: "haber-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        model_loaded: state.model.is_some(),
        model: state.model.as_ref().map(|m| m.variant.to_string()),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
