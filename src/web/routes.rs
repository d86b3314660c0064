//! Route definitions organised by resource.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::web::{handlers, state::AppState};

/// Liveness and readiness probes
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
}

pub fn request_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/requests", post(handlers::requests::create_request))
        .route("/v1/requests/{id}", get(handlers::requests::get_request))
        .route(
            "/v1/requests/{id}/progress",
            get(handlers::requests::get_progress),
        )
        .route("/v1/requests/{id}/events", get(handlers::requests::list_events))
        .route(
            "/v1/requests/{id}/cancel",
            post(handlers::requests::cancel_request),
        )
        .route(
            "/v1/requests/{id}/rework",
            post(handlers::requests::rework_request),
        )
}

pub fn task_routes() -> Router<Arc<AppState>> {
    Router::new().route("/v1/tasks/{id}/retry", post(handlers::tasks::retry_task))
}

/// Inbound results from the automation system
pub fn callback_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/v1/callbacks/automation",
        post(handlers::callbacks::automation_callback),
    )
}
