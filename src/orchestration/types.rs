//! Shared value types for the orchestration layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ContentRequest, RequestTask};
use crate::state_machine::RequestStatus;

/// Default code stored for error callbacks that carry no code of their own
pub const DEFAULT_CALLBACK_ERROR_CODE: &str = "AUTOMATION_WORKFLOW_ERROR";
pub const TASK_TIMEOUT_CODE: &str = "TASK_TIMEOUT";

/// Terminal result of one task attempt, from a callback, an inline
/// capability run, or the timeout sweep
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed {
        output: Value,
        output_url: Option<String>,
    },
    Failed {
        code: String,
        message: String,
        retriable: bool,
    },
}

impl TaskOutcome {
    pub fn failed(code: impl Into<String>, message: impl Into<String>, retriable: bool) -> Self {
        Self::Failed {
            code: code.into(),
            message: message.into(),
            retriable,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "success",
            Self::Failed { .. } => "error",
        }
    }
}

/// What applying an outcome did to the task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ResumeResult {
    Completed,
    RetryScheduled { retry_count: i32 },
    /// Retries exhausted or non-retryable; the request was cancelled
    Failed,
    /// Nothing changed: duplicate, late, or stale
    Ignored { reason: String },
}

impl ResumeResult {
    pub fn applied(&self) -> bool {
        !matches!(self, Self::Ignored { .. })
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Success,
    Error,
}

/// Error detail in a callback: a bare message or `{code, message}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallbackError {
    Message(String),
    Detailed {
        #[serde(default)]
        code: Option<String>,
        message: String,
    },
}

/// Body posted by the automation system when a workflow finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub request_id: Uuid,
    pub task_id: Uuid,
    pub execution_id: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub status: CallbackStatus,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<CallbackError>,
}

impl CallbackPayload {
    /// Convert to a task outcome. Error callbacks are always retriable.
    pub fn to_outcome(&self) -> TaskOutcome {
        match self.status {
            CallbackStatus::Success => {
                let output = self
                    .result
                    .clone()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                let output_url = ["output_url", "outputUrl", "url"]
                    .iter()
                    .find_map(|key| output.get(*key).and_then(Value::as_str))
                    .map(str::to_string);
                TaskOutcome::Completed { output, output_url }
            }
            CallbackStatus::Error => {
                let (code, message) = match &self.error {
                    Some(CallbackError::Message(message)) => {
                        (DEFAULT_CALLBACK_ERROR_CODE.to_string(), message.clone())
                    }
                    Some(CallbackError::Detailed { code, message }) => (
                        code.clone()
                            .unwrap_or_else(|| DEFAULT_CALLBACK_ERROR_CODE.to_string()),
                        message.clone(),
                    ),
                    None => (
                        DEFAULT_CALLBACK_ERROR_CODE.to_string(),
                        "workflow reported an error".to_string(),
                    ),
                };
                TaskOutcome::Failed {
                    code,
                    message,
                    retriable: true,
                }
            }
        }
    }
}

/// Acknowledgement returned to the automation system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub received: bool,
    pub applied: bool,
    pub message: String,
}

impl CallbackAck {
    pub fn applied(message: impl Into<String>) -> Self {
        Self {
            received: true,
            applied: true,
            message: message.into(),
        }
    }

    pub fn noop(message: impl Into<String>) -> Self {
        Self {
            received: true,
            applied: false,
            message: message.into(),
        }
    }
}

/// Counts from one processing pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    pub iterations: u32,
    pub dispatched: usize,
    pub completed_inline: usize,
    pub failed: usize,
    pub deferred: usize,
    pub final_status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub task_count: usize,
}

/// A request with its tasks in sequence order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: ContentRequest,
    pub tasks: Vec<RequestTask>,
}
