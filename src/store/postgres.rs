//! Postgres-backed [`RequestStore`].
//!
//! Rows are read into flat `FromRow` structs and converted to domain models,
//! so an unknown status or role string surfaces as [`StoreError::Corrupt`]
//! instead of a panic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{CasResult, RequestStore, StoreError, StoreResult, TaskUpdate};
use crate::config::DatabaseSettings;
use crate::models::{AgentRole, ContentRequest, RequestEvent, RequestTask, RequestType};
use crate::state_machine::{RequestStatus, TaskStatus};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone, FromRow)]
struct RequestRow {
    id: Uuid,
    brand_id: Uuid,
    campaign_id: Option<Uuid>,
    request_type: String,
    status: String,
    requirements: serde_json::Value,
    settings: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for ContentRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let request_type: RequestType =
            row.request_type
                .parse()
                .map_err(|e: crate::error::OrchestratorError| StoreError::Corrupt {
                    entity: "content_request",
                    message: e.to_string(),
                })?;
        let status: RequestStatus = row.status.parse().map_err(|message| StoreError::Corrupt {
            entity: "content_request",
            message,
        })?;
        Ok(ContentRequest {
            id: row.id,
            brand_id: row.brand_id,
            campaign_id: row.campaign_id,
            request_type,
            status,
            requirements: row.requirements,
            settings: row.settings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct TaskRow {
    id: Uuid,
    request_id: Uuid,
    name: String,
    agent_role: String,
    sequence_order: i32,
    dependencies: Vec<String>,
    status: String,
    retryable: bool,
    retry_count: i32,
    input_data: serde_json::Value,
    output_data: Option<serde_json::Value>,
    output_url: Option<String>,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn corrupt_task(message: String) -> StoreError {
    StoreError::Corrupt {
        entity: "request_task",
        message,
    }
}

impl TryFrom<TaskRow> for RequestTask {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let agent_role: AgentRole = row.agent_role.parse().map_err(corrupt_task)?;
        let status: TaskStatus = row.status.parse().map_err(corrupt_task)?;
        let dependencies = row
            .dependencies
            .iter()
            .map(|role| role.parse::<AgentRole>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(corrupt_task)?;
        Ok(RequestTask {
            id: row.id,
            request_id: row.request_id,
            name: row.name,
            agent_role,
            sequence_order: row.sequence_order,
            dependencies,
            status,
            retryable: row.retryable,
            retry_count: row.retry_count,
            input_data: row.input_data,
            output_data: row.output_data,
            output_url: row.output_url,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct EventRow {
    id: Uuid,
    request_id: Uuid,
    task_id: Option<Uuid>,
    event_type: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for RequestEvent {
    fn from(row: EventRow) -> Self {
        RequestEvent {
            id: row.id,
            request_id: row.request_id,
            task_id: row.task_id,
            event_type: row.event_type,
            payload: row.payload,
            created_at: row.created_at,
        }
    }
}

const REQUEST_COLUMNS: &str = "id, brand_id, campaign_id, request_type, status, requirements, \
     settings, created_at, updated_at";

const TASK_COLUMNS: &str = "id, request_id, name, agent_role, sequence_order, dependencies, \
     status, retryable, retry_count, input_data, output_data, output_url, error_message, \
     started_at, completed_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with pool settings from configuration and run migrations
    pub async fn connect(url: &str, settings: &DatabaseSettings) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
            .connect(url)
            .await?;
        MIGRATOR.run(&pool).await?;
        info!(
            max_connections = settings.max_connections,
            "🗄️ Postgres request store ready"
        );
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn current_task_status(&self, task_id: Uuid) -> StoreResult<Option<TaskStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM request_tasks WHERE id = $1")
                .bind(task_id)
                .fetch_optional(&self.pool)
                .await?;
        status
            .map(|s| s.parse::<TaskStatus>().map_err(corrupt_task))
            .transpose()
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    #[instrument(skip(self, request, tasks), fields(request_id = %request.id))]
    async fn create_request_with_tasks(
        &self,
        request: &ContentRequest,
        tasks: &[RequestTask],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO content_requests (id, brand_id, campaign_id, request_type, status, \
             requirements, settings, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(request.id)
        .bind(request.brand_id)
        .bind(request.campaign_id)
        .bind(request.request_type.as_str())
        .bind(request.status.to_string())
        .bind(&request.requirements)
        .bind(&request.settings)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *tx)
        .await?;

        for task in tasks {
            let dependencies: Vec<String> =
                task.dependencies.iter().map(|r| r.to_string()).collect();
            sqlx::query(
                "INSERT INTO request_tasks (id, request_id, name, agent_role, sequence_order, \
                 dependencies, status, retryable, retry_count, input_data, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(task.id)
            .bind(task.request_id)
            .bind(&task.name)
            .bind(task.agent_role.as_str())
            .bind(task.sequence_order)
            .bind(&dependencies)
            .bind(task.status.to_string())
            .bind(task.retryable)
            .bind(task.retry_count)
            .bind(&task.input_data)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(task_count = tasks.len(), "Request and tasks persisted");
        Ok(())
    }

    async fn get_request(&self, request_id: Uuid) -> StoreResult<Option<ContentRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM content_requests WHERE id = $1");
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?
            .map(ContentRequest::try_from)
            .transpose()
    }

    async fn list_active_requests(&self) -> StoreResult<Vec<ContentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM content_requests \
             WHERE status NOT IN ('published', 'cancelled') ORDER BY created_at"
        );
        sqlx::query_as::<_, RequestRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ContentRequest::try_from)
            .collect()
    }

    async fn cas_request_status(
        &self,
        request_id: Uuid,
        expected: RequestStatus,
        target: RequestStatus,
    ) -> StoreResult<CasResult<RequestStatus>> {
        let updated = sqlx::query(
            "UPDATE content_requests SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(request_id)
        .bind(expected.to_string())
        .bind(target.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 1 {
            return Ok(CasResult::Success);
        }

        let actual: Option<String> =
            sqlx::query_scalar("SELECT status FROM content_requests WHERE id = $1")
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await?;
        match actual {
            None => Ok(CasResult::NotFound),
            Some(status) => {
                let actual = status.parse().map_err(|message| StoreError::Corrupt {
                    entity: "content_request",
                    message,
                })?;
                Ok(CasResult::StateMismatch { actual })
            }
        }
    }

    async fn get_task(&self, task_id: Uuid) -> StoreResult<Option<RequestTask>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM request_tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .map(RequestTask::try_from)
            .transpose()
    }

    async fn list_tasks(&self, request_id: Uuid) -> StoreResult<Vec<RequestTask>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM request_tasks WHERE request_id = $1 ORDER BY sequence_order"
        );
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(RequestTask::try_from)
            .collect()
    }

    async fn list_in_progress_tasks(&self) -> StoreResult<Vec<RequestTask>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM request_tasks WHERE status = 'in_progress' ORDER BY started_at"
        );
        sqlx::query_as::<_, TaskRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(RequestTask::try_from)
            .collect()
    }

    #[instrument(skip(self, update), fields(target = %update.status))]
    async fn cas_task(
        &self,
        task_id: Uuid,
        expected: TaskStatus,
        update: TaskUpdate,
    ) -> StoreResult<CasResult<TaskStatus>> {
        let updated = sqlx::query(
            "UPDATE request_tasks SET \
               status = $3, \
               retry_count = COALESCE($4, retry_count), \
               output_data = CASE WHEN $5 THEN $6 ELSE COALESCE($6, output_data) END, \
               output_url = CASE WHEN $5 THEN $7 ELSE COALESCE($7, output_url) END, \
               error_message = CASE WHEN $5 THEN $8 ELSE COALESCE($8, error_message) END, \
               started_at = CASE WHEN $5 THEN $9 ELSE COALESCE($9, started_at) END, \
               completed_at = CASE WHEN $5 THEN $10 ELSE COALESCE($10, completed_at) END, \
               updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(task_id)
        .bind(expected.to_string())
        .bind(update.status.to_string())
        .bind(update.retry_count)
        .bind(update.reset)
        .bind(&update.output_data)
        .bind(&update.output_url)
        .bind(&update.error_message)
        .bind(update.started_at)
        .bind(update.completed_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 1 {
            return Ok(CasResult::Success);
        }
        Ok(match self.current_task_status(task_id).await? {
            None => CasResult::NotFound,
            Some(actual) => CasResult::StateMismatch { actual },
        })
    }

    async fn append_event(&self, event: &RequestEvent) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO request_events (id, request_id, task_id, event_type, payload, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.id)
        .bind(event.request_id)
        .bind(event.task_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_events(&self, request_id: Uuid) -> StoreResult<Vec<RequestEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, request_id, task_id, event_type, payload, created_at \
             FROM request_events WHERE request_id = $1 ORDER BY event_seq",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RequestEvent::from).collect())
    }
}
