use thiserror::Error;
use uuid::Uuid;

use super::states::{RequestStatus, TaskStatus};

/// Errors raised by lifecycle validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("{message}")]
    IllegalTransition {
        from: RequestStatus,
        to: RequestStatus,
        suggested: Option<RequestStatus>,
        message: String,
    },

    #[error("Task {task_id} cannot transition from {from} to {to}")]
    InvalidTaskTransition {
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
