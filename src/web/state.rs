//! # Web API Application State
//!
//! Shared, cheaply cloned handles for request handlers.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::orchestration::RequestOrchestrator;
use crate::resilience::CircuitBreakerManager;

#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<RequestOrchestrator>,
    pub breakers: Arc<CircuitBreakerManager>,
    pub environment: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<RequestOrchestrator>,
        breakers: Arc<CircuitBreakerManager>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            breakers,
            environment: environment.into(),
            started_at: Utc::now(),
        }
    }
}
