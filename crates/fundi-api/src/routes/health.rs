//! # Health Probes

use axum::routing::get;
use axum::Json;

use crate::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/health", get(health))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
