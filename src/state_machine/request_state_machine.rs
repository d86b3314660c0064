//! # Request Lifecycle Rules
//!
//! Pure functions describing which status changes a content request may make.
//!
//! ```text
//! intake -> draft -> production -> qa -> published
//!    \        \          \          \ \-> draft (rework)
//!     \--------\----------\----------\--> cancelled
//! ```
//!
//! Nothing here touches storage; the orchestrator pairs these checks with a
//! conditional update so a validated transition is only applied when the
//! persisted status still matches.

use serde::Serialize;

use super::errors::{StateMachineError, StateMachineResult};
use super::states::{RequestStatus, StatusStage};

/// Outcome of validating a single requested transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionValidation {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub valid: bool,
    pub error: Option<String>,
    /// Legal next state when `to` skips ahead along the happy path
    pub suggested: Option<RequestStatus>,
}

impl TransitionValidation {
    pub fn into_result(self) -> StateMachineResult<()> {
        if self.valid {
            return Ok(());
        }
        Err(StateMachineError::IllegalTransition {
            from: self.from,
            to: self.to,
            suggested: self.suggested,
            message: self
                .error
                .unwrap_or_else(|| format!("Invalid transition: {} -> {}", self.from, self.to)),
        })
    }
}

/// Legal targets from `from`
pub fn allowed_transitions(from: RequestStatus) -> &'static [RequestStatus] {
    use RequestStatus::*;
    match from {
        Intake => &[Draft, Cancelled],
        Draft => &[Production, Cancelled],
        Production => &[Qa, Cancelled],
        Qa => &[Published, Draft, Cancelled],
        Published | Cancelled => &[],
    }
}

pub fn can_transition(from: RequestStatus, to: RequestStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Happy-path successor, `None` at terminal states
pub fn next_status(status: RequestStatus) -> Option<RequestStatus> {
    use RequestStatus::*;
    match status {
        Intake => Some(Draft),
        Draft => Some(Production),
        Production => Some(Qa),
        Qa => Some(Published),
        Published | Cancelled => None,
    }
}

pub fn validate_transition(from: RequestStatus, to: RequestStatus) -> TransitionValidation {
    if can_transition(from, to) {
        return TransitionValidation {
            from,
            to,
            valid: true,
            error: None,
            suggested: None,
        };
    }

    let allowed = allowed_transitions(from);
    let error = if from.is_terminal() {
        format!("Invalid transition: {from} -> {to}. {from} is a terminal status")
    } else if from == to {
        format!("Invalid transition: {from} -> {to}. Request is already {from}")
    } else {
        let listed = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("Invalid transition: {from} -> {to}. Allowed transitions: {listed}")
    };

    let suggested = match (from.ordinal(), to.ordinal()) {
        (Some(f), Some(t)) if t > f + 1 => next_status(from),
        _ => None,
    };

    TransitionValidation {
        from,
        to,
        valid: false,
        error: Some(error),
        suggested,
    }
}

/// Ordered list of happy-path states strictly between `from` and `to`, then `to`.
///
/// Returns an empty path when `to` is not ahead of `from` on the happy path.
pub fn forward_path(from: RequestStatus, to: RequestStatus) -> Vec<RequestStatus> {
    let mut path = Vec::new();
    match (from.ordinal(), to.ordinal()) {
        (Some(f), Some(t)) if t > f => {}
        _ => return path,
    }
    let mut current = from;
    while let Some(next) = next_status(current) {
        path.push(next);
        if next == to {
            break;
        }
        current = next;
    }
    path
}

pub fn stage(status: RequestStatus) -> StatusStage {
    status.stage()
}

pub fn stage_description(status: RequestStatus) -> &'static str {
    status.stage().description()
}

/// Coarse completion indicator for a status alone, ignoring task detail
pub fn status_completion_percent(status: RequestStatus) -> u8 {
    match status {
        RequestStatus::Intake => 10,
        RequestStatus::Draft => 40,
        RequestStatus::Production => 70,
        RequestStatus::Qa => 90,
        RequestStatus::Published => 100,
        RequestStatus::Cancelled => 0,
    }
}
