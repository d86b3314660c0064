//! # Request Event Log
//!
//! Immutable audit facts about requests and their tasks. Events are written
//! for observability only; no orchestration decision ever reads them back.

pub mod log;
pub mod publisher;
pub mod relay;
pub mod types;

pub use log::EventLog;
pub use publisher::EventPublisher;
pub use relay::EventRelay;
pub use types::{output_preview, EventType, OUTPUT_PREVIEW_CHARS};
