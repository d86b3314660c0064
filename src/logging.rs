//! # Logging
//!
//! One `tracing` subscriber per process. Production writes JSON lines; every
//! other environment writes readable console output. `RUST_LOG` replaces the
//! per-environment default filter.

use chrono::Utc;
use std::env;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

static INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber once. Later calls, and a subscriber
/// installed by someone else (test harnesses), are left alone.
pub fn init_structured_logging() {
    INIT.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level(&environment)));

        let installed = if environment == "production" {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()
        } else {
            let layer = fmt::layer()
                .with_thread_ids(true)
                .with_ansi(environment != "test")
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()
        };

        match installed {
            Ok(()) => tracing::info!(
                pid = std::process::id(),
                environment = %environment,
                "🔧 Logging ready"
            ),
            Err(_) => tracing::debug!("Subscriber already installed; keeping it"),
        }
    });
}

/// `CONTENT_ORCHESTRATOR_ENV`, then `APP_ENV`, then `development`
pub fn get_environment() -> String {
    env::var("CONTENT_ORCHESTRATOR_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn default_level(environment: &str) -> &'static str {
    if environment == "production" {
        "info"
    } else {
        "debug"
    }
}

/// Log structured data for request-level operations
pub fn log_request_operation(
    operation: &str,
    request_id: Uuid,
    request_type: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        request_id = %request_id,
        request_type = request_type,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 REQUEST_OPERATION"
    );
}

/// Log structured data for task-level operations
pub fn log_task_operation(
    operation: &str,
    request_id: Uuid,
    task_id: Uuid,
    agent_role: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        request_id = %request_id,
        task_id = %task_id,
        agent_role = %agent_role,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔧 TASK_OPERATION"
    );
}

/// Log outbound dispatch activity
pub fn log_dispatch_operation(
    operation: &str,
    task_id: Uuid,
    target: &str,
    outcome: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        task_id = %task_id,
        target = %target,
        outcome = %outcome,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🚀 DISPATCH_OPERATION"
    );
}
