//! # Health Check Handlers
//!
//! Liveness and readiness probes. Readiness reports the store, the
//! automation system, and every circuit breaker; only a failing store makes
//! the service unready. Open breakers report `degraded`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::resilience::CircuitBreakerMetrics;
use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub environment: String,
    pub uptime_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: Option<String>,
}

impl HealthCheck {
    fn ok() -> Self {
        Self {
            status: "healthy".to_string(),
            message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HashMap<String, HealthCheck>,
    pub circuit_breakers: HashMap<String, CircuitBreakerMetrics>,
    pub open_circuits: Vec<String>,
    pub outstanding_dispatches: usize,
}

/// Basic health check endpoint: GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: now,
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.clone(),
        uptime_seconds: (now - state.started_at).num_seconds(),
    })
}

/// Readiness probe: GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let mut checks = HashMap::new();

    let store_ok = match state.orchestrator.store().get_request(Uuid::nil()).await {
        Ok(_) => {
            checks.insert("store".to_string(), HealthCheck::ok());
            true
        }
        Err(err) => {
            warn!(error = %err, "Readiness: store check failed");
            checks.insert("store".to_string(), HealthCheck::failed(err.to_string()));
            false
        }
    };

    let automation = match state.orchestrator.dispatcher().automation_healthy().await {
        Some(true) => HealthCheck::ok(),
        Some(false) => HealthCheck::failed("automation health endpoint did not answer"),
        None => HealthCheck {
            status: "not_configured".to_string(),
            message: Some("direct capabilities only".to_string()),
        },
    };
    checks.insert("automation".to_string(), automation);

    let metrics = state.breakers.get_system_metrics();
    let open_circuits: Vec<String> = metrics
        .open_circuits()
        .into_iter()
        .map(str::to_string)
        .collect();

    let status = if !store_ok {
        "unavailable"
    } else if open_circuits.is_empty() {
        "ready"
    } else {
        "degraded"
    };
    let code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(ReadinessResponse {
            status: status.to_string(),
            timestamp: Utc::now(),
            checks,
            circuit_breakers: metrics.circuit_breakers,
            open_circuits,
            outstanding_dispatches: state.orchestrator.dispatcher().tracker().outstanding(),
        }),
    )
}
