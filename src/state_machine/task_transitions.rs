use uuid::Uuid;

use super::errors::{StateMachineError, StateMachineResult};
use super::states::TaskStatus;

/// Whether a task may move from `from` to `to`.
///
/// `in_progress -> pending` covers pipeline retries and rework resets;
/// `failed -> pending` covers operator retries.
pub fn can_transition_task(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Cancelled)
            | (InProgress, Completed)
            | (InProgress, Failed)
            | (InProgress, Pending)
            | (InProgress, Cancelled)
            | (Failed, Pending)
            | (Failed, Cancelled)
            | (Completed, Pending)
    )
}

pub fn validate_task_transition(
    task_id: Uuid,
    from: TaskStatus,
    to: TaskStatus,
) -> StateMachineResult<()> {
    if can_transition_task(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::InvalidTaskTransition { task_id, from, to })
    }
}
