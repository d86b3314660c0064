//! # Content Request Handlers
//!
//! Submission, inspection, and operator actions on content requests.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::{AgentRole, ContentRequest, NewContentRequest, RequestEvent};
use crate::orchestration::{ProgressSnapshot, RequestView, SubmissionResult};
use crate::web::errors::ApiResult;
use crate::web::state::AppState;

const DEFAULT_CANCELLED_BY: &str = "api";

#[derive(Debug, Clone, Deserialize)]
pub struct CancelRequestBody {
    pub reason: String,
    #[serde(default)]
    pub cancelled_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReworkRequestBody {
    pub from_role: AgentRole,
    pub reason: String,
}

/// Submit a content request: POST /v1/requests
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewContentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmissionResult>)> {
    let Json(new_request) = body?;
    info!(
        brand_id = %new_request.brand_id,
        request_type = %new_request.request_type,
        "Submitting content request via web API"
    );
    let result = state.orchestrator.submit(new_request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Request with its tasks: GET /v1/requests/{id}
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<RequestView>> {
    Ok(Json(state.orchestrator.get_request(request_id).await?))
}

/// GET /v1/requests/{id}/progress
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<ProgressSnapshot>> {
    Ok(Json(state.orchestrator.progress(request_id).await?))
}

/// Audit trail in insertion order: GET /v1/requests/{id}/events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RequestEvent>>> {
    Ok(Json(state.orchestrator.events(request_id).await?))
}

/// POST /v1/requests/{id}/cancel
pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
    body: Result<Json<CancelRequestBody>, JsonRejection>,
) -> ApiResult<Json<ContentRequest>> {
    let Json(body) = body?;
    let cancelled_by = body.cancelled_by.as_deref().unwrap_or(DEFAULT_CANCELLED_BY);
    let request = state
        .orchestrator
        .cancel_request(request_id, &body.reason, cancelled_by)
        .await?;
    Ok(Json(request))
}

/// Send a request in review back for rework: POST /v1/requests/{id}/rework
pub async fn rework_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
    body: Result<Json<ReworkRequestBody>, JsonRejection>,
) -> ApiResult<Json<ContentRequest>> {
    let Json(body) = body?;
    let request = state
        .orchestrator
        .request_rework(request_id, body.from_role, &body.reason)
        .await?;
    Ok(Json(request))
}
