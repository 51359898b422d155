use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use super::AppState;

/// `GET /health` -- liveness check.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /metrics` -- returns gateway counters as JSON.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.gateway.metrics().snapshot();
    (StatusCode::OK, Json(snap))
}
