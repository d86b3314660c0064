use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable audit fact.
/// Maps to `request_events` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEvent {
    pub id: Uuid,
    pub request_id: Uuid,
    pub task_id: Option<Uuid>,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// New event for appending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequestEvent {
    pub request_id: Uuid,
    pub task_id: Option<Uuid>,
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl NewRequestEvent {
    pub fn into_event(self) -> RequestEvent {
        RequestEvent {
            id: Uuid::new_v4(),
            request_id: self.request_id,
            task_id: self.task_id,
            event_type: self.event_type,
            payload: self.payload,
            created_at: Utc::now(),
        }
    }
}
