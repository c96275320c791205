//! Health check HTTP handlers
//!
//! Liveness only says the process answers; readiness says a snapshot is
//! published and reads can be served.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::web::AppState;

/// Health check endpoint
///
/// Always answers 200 and reports whether the catalogue is loaded
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.cache.status().await;

    Json(json!({
        "status": if status.ready { "healthy" } else { "degraded" },
        "ready": status.ready,
        "artists": status.artists,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn liveness_check() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

/// 503 until the first snapshot has been published
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    if state.cache.is_ready().await {
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready" })),
        )
            .into_response()
    }
}
