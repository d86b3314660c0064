#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Content Orchestrator
//!
//! Request orchestration engine that drives content requests (videos, images,
//! copy, carousels) through a multi-agent production pipeline.
//!
//! ## Overview
//!
//! A submitted request is expanded into a fixed task graph for its type. Each
//! task is handed either to an external automation system, which answers
//! later by callback, or to a synchronous agent capability. The orchestrator
//! keeps request status in lockstep with task progress, retries failed tasks
//! within a pipeline budget, and cancels the request when work cannot finish.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - task graphs, processing passes, resume, operator actions
//! - [`state_machine`] - request and task status rules
//! - [`dispatch`] - automation client, direct generation, payloads
//! - [`resilience`] - circuit breakers, retry with backoff, idempotency cache
//! - [`store`] - persistence behind a compare-and-swap trait
//! - [`events`] - append-only audit log
//! - [`registry`] - direct agent capabilities keyed by role
//! - [`web`] - REST API and health probes
//! - [`config`] - TOML configuration with environment overlays
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use content_orchestrator::config::OrchestratorConfig;
//! use content_orchestrator::dispatch::DispatchAdapter;
//! use content_orchestrator::events::{EventLog, EventPublisher};
//! use content_orchestrator::models::NewContentRequest;
//! use content_orchestrator::orchestration::RequestOrchestrator;
//! use content_orchestrator::registry::CapabilityRegistry;
//! use content_orchestrator::resilience::CircuitBreakerManager;
//! use content_orchestrator::store::InMemoryRequestStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::default();
//! let store = Arc::new(InMemoryRequestStore::new());
//! let breakers = Arc::new(CircuitBreakerManager::from_settings(&config.circuit_breakers));
//! let dispatcher = Arc::new(DispatchAdapter::new(
//!     &config,
//!     None,
//!     Arc::new(CapabilityRegistry::new()),
//!     breakers,
//! ));
//! let events = EventLog::new(store.clone(), EventPublisher::default());
//! let orchestrator =
//!     RequestOrchestrator::new(store, dispatcher, events, config.orchestration.clone());
//!
//! let submitted = orchestrator
//!     .submit(NewContentRequest {
//!         brand_id: uuid::Uuid::new_v4(),
//!         campaign_id: None,
//!         request_type: "text".to_string(),
//!         requirements: serde_json::json!({"brief": "Launch post"}),
//!         settings: serde_json::json!({}),
//!     })
//!     .await?;
//! println!("request {} is {}", submitted.request_id, submitted.status);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod resilience;
pub mod state_machine;
pub mod store;
pub mod web;

pub use config::{ConfigManager, OrchestratorConfig};
pub use error::{OrchestratorError, Result};
pub use models::{AgentRole, ContentRequest, NewContentRequest, RequestTask, RequestType};
pub use orchestration::{RequestOrchestrator, TaskGraphFactory};
pub use state_machine::{RequestStatus, TaskStatus};
