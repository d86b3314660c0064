use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest serialized output kept in a `task_completed` event
pub const OUTPUT_PREVIEW_CHARS: usize = 500;

/// Kinds of audit events written to the request event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RequestCreated,
    StatusChanged,
    RequestCancelled,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    TaskRetryScheduled,
    TaskDeadLettered,
    DispatchDeferred,
    ProviderCallbackReceived,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCreated => "request_created",
            Self::StatusChanged => "status_changed",
            Self::RequestCancelled => "request_cancelled",
            Self::TaskStarted => "task_started",
            Self::TaskCompleted => "task_completed",
            Self::TaskFailed => "task_failed",
            Self::TaskRetryScheduled => "task_retry_scheduled",
            Self::TaskDeadLettered => "task_dead_lettered",
            Self::DispatchDeferred => "dispatch_deferred",
            Self::ProviderCallbackReceived => "provider_callback_received",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized preview of a task output, cut at [`OUTPUT_PREVIEW_CHARS`]
pub fn output_preview(output: &serde_json::Value) -> String {
    let rendered = output.to_string();
    if rendered.chars().count() <= OUTPUT_PREVIEW_CHARS {
        rendered
    } else {
        rendered.chars().take(OUTPUT_PREVIEW_CHARS).collect()
    }
}
