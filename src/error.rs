//! # Orchestrator Errors
//!
//! Crate-level error taxonomy. Lower layers (store, dispatch, state machine,
//! resilience) keep their own `thiserror` enums and convert into
//! [`OrchestratorError`] at the orchestrator boundary.

use thiserror::Error;
use uuid::Uuid;

use crate::dispatch::DispatchError;
use crate::state_machine::{RequestStatus, StateMachineError};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),

    #[error("No workflow or direct capability for task '{task_name}' ({content_type})")]
    WorkflowNotFound {
        task_name: String,
        content_type: String,
    },

    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("Circuit breaker open for {component}")]
    CircuitOpen { component: String },

    #[error("Task {task_id} is not ready: {reason}")]
    TaskNotReady { task_id: Uuid, reason: String },

    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: RequestStatus,
        to: RequestStatus,
        suggested: Option<RequestStatus>,
    },

    #[error("Request not found: {0}")]
    RequestNotFound(Uuid),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Request {request_id} is already terminal ({status})")]
    RequestTerminal {
        request_id: Uuid,
        status: RequestStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl OrchestratorError {
    /// Whether the caller may try the same operation again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestratorError::DispatchFailed(_) | OrchestratorError::CircuitOpen { .. }
        )
    }
}

impl From<StateMachineError> for OrchestratorError {
    fn from(err: StateMachineError) -> Self {
        match err {
            StateMachineError::IllegalTransition {
                from,
                to,
                suggested,
                ..
            } => OrchestratorError::IllegalTransition {
                from,
                to,
                suggested,
            },
            StateMachineError::InvalidTaskTransition { task_id, from, to } => {
                OrchestratorError::TaskNotReady {
                    task_id,
                    reason: format!("task cannot move from {from} to {to}"),
                }
            }
        }
    }
}

impl From<DispatchError> for OrchestratorError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::CircuitOpen { component } => OrchestratorError::CircuitOpen { component },
            DispatchError::WorkflowNotFound {
                task_name,
                content_type,
            } => OrchestratorError::WorkflowNotFound {
                task_name,
                content_type,
            },
            other => OrchestratorError::DispatchFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
