//! # Domain Models
//!
//! Requests, their tasks, the audit events attached to them, and the typed
//! payloads passed between pipeline stages.

pub mod content_request;
pub mod payloads;
pub mod provider_dispatch;
pub mod request_event;
pub mod request_task;
pub mod request_type;

pub use content_request::{ContentRequest, NewContentRequest};
pub use payloads::{PayloadError, StageOutput};
pub use provider_dispatch::{DispatchStatus, ProviderDispatch};
pub use request_event::{NewRequestEvent, RequestEvent};
pub use request_task::{completed_roles, RequestTask};
pub use request_type::{AgentRole, RequestType};
