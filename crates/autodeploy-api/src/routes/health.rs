//! Health check endpoints.

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready while the deploy worker is still taking events.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.queue.is_closed() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "deploy worker stopped" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({ "status": "ready", "queued": state.queue.pending() })),
    )
}
