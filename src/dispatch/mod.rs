//! # Dispatch
//!
//! Everything between a ready task and the worker that runs it: workflow
//! selection, payload construction, the automation HTTP client, direct
//! generation through capabilities, and correlation of outstanding
//! executions for callback matching.

pub mod adapter;
pub mod automation_client;
pub mod error;
pub mod generation;
pub mod payload;
pub mod tracker;
pub mod workflow_registry;

pub use adapter::{
    DispatchAdapter, DispatchMode, DispatchOutcome, AUTOMATION_COMPONENT, GENERATION_COMPONENT,
};
pub use automation_client::{AutomationClient, HttpAutomationClient, WorkflowExecution};
pub use error::DispatchError;
pub use payload::{callback_url, dispatch_idempotency_key, DispatchPayload};
pub use tracker::{DispatchTracker, ExecutionMatch};
pub use workflow_registry::{WorkflowCategory, WorkflowRegistry, WorkflowTarget};
