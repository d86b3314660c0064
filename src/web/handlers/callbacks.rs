//! # Automation Callback Handler
//!
//! Receives workflow results from the automation system. Safe to repeat:
//! duplicates, late deliveries and callbacks for finished requests are
//! acknowledged with `applied: false`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::debug;

use crate::orchestration::{CallbackAck, CallbackPayload};
use crate::web::errors::ApiResult;
use crate::web::state::AppState;

/// POST /v1/callbacks/automation
pub async fn automation_callback(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CallbackPayload>, JsonRejection>,
) -> ApiResult<Json<CallbackAck>> {
    let Json(payload) = body?;
    debug!(
        request_id = %payload.request_id,
        task_id = %payload.task_id,
        execution_id = %payload.execution_id,
        workflow_id = ?payload.workflow_id,
        "Automation callback received"
    );
    Ok(Json(state.orchestrator.handle_callback(payload).await?))
}
