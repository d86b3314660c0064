use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Accepted by the automation system, awaiting callback
    Dispatched,
    /// Callback applied
    Resolved,
}

/// Record of one asynchronous dispatch, kept only to correlate callbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDispatch {
    pub request_id: Uuid,
    pub task_id: Uuid,
    pub idempotency_key: String,
    pub workflow_id: String,
    pub execution_id: String,
    pub status: DispatchStatus,
    pub dispatched_at: DateTime<Utc>,
}

impl ProviderDispatch {
    /// Whether a callback carrying `execution_id` belongs to this dispatch
    pub fn matches_execution(&self, execution_id: &str) -> bool {
        self.execution_id == execution_id
    }
}
