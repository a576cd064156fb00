//! HTTP routes.

pub mod health;
pub mod webhooks;

use crate::AppState;
use axum::Router;

/// Build the router: the webhook endpoint at the configured path plus health.
pub fn router(state: AppState) -> Router {
    let webhook_path = state.config.server.path.clone();

    Router::new()
        .merge(webhooks::router(&webhook_path))
        .merge(health::router())
        .with_state(state)
}
