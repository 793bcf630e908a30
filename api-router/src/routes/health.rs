use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Liveness probe: always returns 200 to indicate the process is running.
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Readiness probe: 200 once the knowledge base holds chunks to retrieve from, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let chunks = state.pipeline.knowledge().len();
    if chunks > 0 {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "knowledge_base": "ok" },
                "chunks": chunks
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "checks": { "knowledge_base": "fail" },
                "reason": "knowledge base is empty"
            })),
        )
    }
}
