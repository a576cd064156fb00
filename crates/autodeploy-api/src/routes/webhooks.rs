//! GitHub webhook endpoint.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::AppState;
use crate::error::ApiError;
use crate::intake::{self, Intake, WebhookRequest};
use autodeploy_core::log_target;

/// Largest delivery GitHub sends.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn router(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, post(github_webhook))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
}

/// Handle one GitHub delivery.
///
/// Responds as soon as the event is queued; the deploy runs later on the
/// worker.
async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = WebhookRequest::from_parts(&headers, &body);
    let delivery = request.delivery.unwrap_or("-");
    let event_type = request.event_type.unwrap_or("-");

    match intake::evaluate(&state.filter, &state.config.secret, &request) {
        Intake::Enqueue { event, branch } => {
            let event_id = event.id;
            let sha = event.short_sha().unwrap_or("-").to_string();

            match state.queue.enqueue(event) {
                Ok(queued) => {
                    info!(
                        target: log_target::REQUESTS,
                        delivery,
                        event_id = %event_id,
                        %sha,
                        queued,
                        "Push to {branch} accepted, deploy queued"
                    );
                    Ok(Json(json!({
                        "status": "queued",
                        "event_id": event_id.to_string(),
                    })))
                }
                Err(e) => {
                    error!(
                        target: log_target::REQUESTS,
                        delivery,
                        event_id = %event_id,
                        "Push to {branch} dropped: {e}"
                    );
                    Err(ApiError::Unavailable("deploy worker is not running".to_string()))
                }
            }
        }
        Intake::Ignore(reason) => {
            info!(target: log_target::REQUESTS, delivery, event_type, "Ignored: {reason}");
            Ok(Json(json!({
                "status": "ignored",
                "reason": reason.to_string(),
            })))
        }
        Intake::Reject(e) => {
            warn!(target: log_target::REQUESTS, delivery, event_type, "Rejected: {e}");
            Err(e.into())
        }
    }
}
