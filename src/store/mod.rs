//! # Request Store
//!
//! Durable state for content requests, their tasks and the audit trail.
//!
//! ## Design
//!
//! Every status write is a compare-and-swap on the status the caller last
//! read. A write whose expectation no longer holds reports
//! [`CasResult::StateMismatch`] instead of overwriting; duplicate or
//! out-of-order callbacks rely on this to become no-ops.
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryRequestStore`]: process-local, used by tests and by single
//!   process runs without a database URL
//! - `PgRequestStore`: Postgres via `sqlx`, conditional `UPDATE ... WHERE
//!   status = $expected` statements

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ContentRequest, RequestEvent, RequestTask};
use crate::state_machine::{RequestStatus, TaskStatus};

pub use memory::InMemoryRequestStore;
#[cfg(feature = "postgres")]
pub use postgres::PgRequestStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Corrupt {entity} row: {message}")]
    Corrupt {
        entity: &'static str,
        message: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a compare-and-swap write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasResult<S> {
    Success,
    NotFound,
    /// The stored status differed from the expected one
    StateMismatch { actual: S },
}

impl<S> CasResult<S> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Field changes applied together with a task status swap.
///
/// `None` leaves a field untouched. With `reset` set, output, error and
/// timestamps are cleared first, so a requeued task starts clean.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: TaskStatus,
    pub retry_count: Option<i32>,
    pub output_data: Option<Value>,
    pub output_url: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub reset: bool,
}

impl TaskUpdate {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            status: TaskStatus::InProgress,
            started_at: Some(now),
            ..Default::default()
        }
    }

    pub fn complete(output: Value, output_url: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: TaskStatus::Completed,
            output_data: Some(output),
            output_url,
            completed_at: Some(now),
            ..Default::default()
        }
    }

    pub fn fail(error_message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: TaskStatus::Failed,
            error_message: Some(error_message.into()),
            completed_at: Some(now),
            ..Default::default()
        }
    }

    /// Back to `pending` for another attempt. The last error is kept for
    /// visibility when given.
    pub fn requeue(retry_count: i32, error_message: Option<String>) -> Self {
        Self {
            status: TaskStatus::Pending,
            retry_count: Some(retry_count),
            error_message,
            reset: true,
            ..Default::default()
        }
    }

    pub fn cancel(error_message: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: TaskStatus::Cancelled,
            error_message,
            completed_at: Some(now),
            ..Default::default()
        }
    }

    /// Apply to an in-memory task
    pub fn apply(&self, task: &mut RequestTask, now: DateTime<Utc>) {
        if self.reset {
            task.output_data = None;
            task.output_url = None;
            task.error_message = None;
            task.started_at = None;
            task.completed_at = None;
        }
        task.status = self.status;
        if let Some(retry_count) = self.retry_count {
            task.retry_count = retry_count;
        }
        if let Some(output) = &self.output_data {
            task.output_data = Some(output.clone());
        }
        if let Some(url) = &self.output_url {
            task.output_url = Some(url.clone());
        }
        if let Some(message) = &self.error_message {
            task.error_message = Some(message.clone());
        }
        if let Some(started_at) = self.started_at {
            task.started_at = Some(started_at);
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = Some(completed_at);
        }
        task.updated_at = now;
    }
}

/// Persistence for requests, tasks and events.
///
/// Implementations must be safe to share between concurrent processing
/// passes; conditional writes are the only synchronisation they provide.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert a request together with its full task set in one unit
    async fn create_request_with_tasks(
        &self,
        request: &ContentRequest,
        tasks: &[RequestTask],
    ) -> StoreResult<()>;

    async fn get_request(&self, request_id: Uuid) -> StoreResult<Option<ContentRequest>>;

    /// Requests not yet `published` or `cancelled`
    async fn list_active_requests(&self) -> StoreResult<Vec<ContentRequest>>;

    async fn cas_request_status(
        &self,
        request_id: Uuid,
        expected: RequestStatus,
        target: RequestStatus,
    ) -> StoreResult<CasResult<RequestStatus>>;

    async fn get_task(&self, task_id: Uuid) -> StoreResult<Option<RequestTask>>;

    /// Tasks of a request ordered by `sequence_order`
    async fn list_tasks(&self, request_id: Uuid) -> StoreResult<Vec<RequestTask>>;

    /// Tasks currently `in_progress` across all requests
    async fn list_in_progress_tasks(&self) -> StoreResult<Vec<RequestTask>>;

    async fn cas_task(
        &self,
        task_id: Uuid,
        expected: TaskStatus,
        update: TaskUpdate,
    ) -> StoreResult<CasResult<TaskStatus>>;

    async fn append_event(&self, event: &RequestEvent) -> StoreResult<()>;

    /// Events of a request in insertion order
    async fn list_events(&self, request_id: Uuid) -> StoreResult<Vec<RequestEvent>>;
}
