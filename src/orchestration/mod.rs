//! # Orchestration Engine
//!
//! Coordinates content requests through their task graphs.
//!
//! ## Core Components
//!
//! - **TaskGraphFactory**: fixed task templates per request type
//! - **ReadyTaskDiscovery**: which pending tasks have their dependencies met
//! - **RequestLifecycle**: request status changes, one legal edge at a time
//! - **RequestOrchestrator**: submit, process, resume, and operator actions
//! - **TaskTimeoutMonitor**: background sweep for stuck and deferred work
//! - **ProgressSnapshot**: read model for progress views

pub mod lifecycle;
pub mod orchestrator;
pub mod progress;
pub mod ready_task_discovery;
pub mod task_graph;
pub mod timeout_monitor;
pub mod types;

pub use lifecycle::{status_for_started_role, RequestLifecycle};
pub use orchestrator::RequestOrchestrator;
pub use progress::{Milestones, ProgressSnapshot, TaskCounts};
pub use ready_task_discovery::ReadyTaskDiscovery;
pub use task_graph::{TaskBlueprint, TaskGraph, TaskGraphFactory};
pub use timeout_monitor::{SweepSummary, TaskTimeoutMonitor};
pub use types::{
    CallbackAck, CallbackError, CallbackPayload, CallbackStatus, ProcessingSummary, RequestView,
    ResumeResult, SubmissionResult, TaskOutcome, DEFAULT_CALLBACK_ERROR_CODE, TASK_TIMEOUT_CODE,
};
