//! # Lifecycle State Machine
//!
//! Status enums for requests and tasks plus the pure transition rules that
//! govern them. Persistence of transitions lives in [`crate::store`]; the
//! orchestrator is the only caller that applies them.

pub mod errors;
pub mod request_state_machine;
pub mod states;
pub mod task_transitions;

pub use errors::{StateMachineError, StateMachineResult};
pub use request_state_machine::{
    allowed_transitions, can_transition, forward_path, next_status,
    stage_description, status_completion_percent, validate_transition, TransitionValidation,
};
pub use states::{RequestStatus, StatusStage, TaskStatus};
pub use task_transitions::{can_transition_task, validate_task_transition};
