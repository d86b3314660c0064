//! Task-level operator actions.

use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::RequestTask;
use crate::web::errors::ApiResult;
use crate::web::state::AppState;

/// Retry a failed task: POST /v1/tasks/{id}/retry
pub async fn retry_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<RequestTask>> {
    info!(task_id = %task_id, "Manual task retry via web API");
    Ok(Json(state.orchestrator.retry_task(task_id).await?))
}
