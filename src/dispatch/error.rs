use std::time::Duration;
use thiserror::Error;

use crate::models::PayloadError;
use crate::resilience::Retryable;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Circuit breaker open for {component}")]
    CircuitOpen { component: String },

    #[error("No workflow or direct capability for task '{task_name}' ({content_type})")]
    WorkflowNotFound {
        task_name: String,
        content_type: String,
    },

    #[error("Automation system returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Dispatch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid dependency output: {0}")]
    InvalidPayload(#[from] PayloadError),

    #[error("Invalid automation response: {0}")]
    InvalidResponse(String),

    #[error("Automation client is not configured")]
    NotConfigured,
}

impl DispatchError {
    /// Error code stored with a failed task as `"CODE: message"`
    pub fn code(&self) -> &'static str {
        match self {
            Self::CircuitOpen { .. } => "CIRCUIT_OPEN",
            Self::WorkflowNotFound { .. } => "WORKFLOW_NOT_FOUND",
            Self::Http { .. } | Self::Transport(_) => "DISPATCH_FAILED",
            Self::Timeout(_) => "DISPATCH_TIMEOUT",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::NotConfigured => "AUTOMATION_NOT_CONFIGURED",
        }
    }

    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Only transient transport problems are worth another network attempt.
/// An open circuit is not: the orchestrator defers the task instead.
impl Retryable for DispatchError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Transport(_) | Self::Timeout(_) => true,
            _ => false,
        }
    }
}
