//! # Orchestrator Configuration
//!
//! TOML-based configuration with environment overlays.
//!
//! ## Architecture
//!
//! - `config/orchestrator/base.toml` holds defaults shared by every environment
//! - `config/orchestrator/environments/{env}.toml` overrides per environment
//! - `CONTENT_ORCH__SECTION__KEY` environment variables override both
//!
//! Every section also has a `Default` so a missing file never leaves a field
//! unset, and every section validates itself after loading.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use content_orchestrator::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let retries = manager.config().orchestration.max_task_retries;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::models::AgentRole;
use crate::resilience::{CircuitBreakerConfig, RetryPolicy, RollingWindowConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub orchestration: OrchestrationSettings,
    pub circuit_breakers: CircuitBreakerSettings,
    pub retry: RetrySettings,
    pub idempotency: IdempotencySettings,
    pub dispatch: DispatchSettings,
    pub timeouts: TaskTimeoutSettings,
    pub database: DatabaseSettings,
    pub web: WebSettings,
}

impl OrchestratorConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.orchestration.validate()?;
        self.circuit_breakers.validate()?;
        self.retry
            .to_policy()
            .validate()
            .map_err(|msg| ConfigurationError::invalid_value("retry", msg))?;
        self.idempotency.validate()?;
        self.dispatch.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationSettings {
    /// Pipeline-level retries per task before the request is cancelled
    pub max_task_retries: u32,
    /// Public base URL the automation system calls back on
    pub callback_base_url: String,
    pub default_budget_tier: String,
    /// Upper bound on dispatch rounds within one processing pass
    pub max_processing_iterations: u32,
    /// Interval of the timeout and deferred-dispatch sweep
    pub sweep_interval_seconds: u64,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            max_task_retries: 3,
            callback_base_url: "http://localhost:8080".to_string(),
            default_budget_tier: "standard".to_string(),
            max_processing_iterations: 10,
            sweep_interval_seconds: 60,
        }
    }
}

impl OrchestrationSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_processing_iterations == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.max_processing_iterations",
                "must be greater than 0",
            ));
        }
        if self.callback_base_url.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "orchestration.callback_base_url",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

/// Thresholds for one named breaker, in config-file units
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CircuitBreakerComponentConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
    pub success_threshold: u32,
    #[serde(default)]
    pub window_seconds: Option<u64>,
    #[serde(default)]
    pub failure_rate_threshold: Option<f64>,
    #[serde(default)]
    pub minimum_calls: Option<u32>,
}

impl CircuitBreakerComponentConfig {
    pub fn to_resilience_config(&self) -> CircuitBreakerConfig {
        let rolling_window = self.window_seconds.map(|secs| {
            let defaults = RollingWindowConfig::default();
            RollingWindowConfig {
                window: Duration::from_secs(secs),
                failure_rate_threshold: self
                    .failure_rate_threshold
                    .unwrap_or(defaults.failure_rate_threshold),
                minimum_calls: self.minimum_calls.unwrap_or(defaults.minimum_calls),
            }
        });
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout: Duration::from_secs(self.timeout_seconds),
            success_threshold: self.success_threshold,
            rolling_window,
        }
    }
}

impl Default for CircuitBreakerComponentConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 60,
            success_threshold: 1,
            window_seconds: None,
            failure_rate_threshold: None,
            minimum_calls: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub enabled: bool,
    pub max_circuit_breakers: usize,
    pub default_config: CircuitBreakerComponentConfig,
    pub component_configs: HashMap<String, CircuitBreakerComponentConfig>,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_circuit_breakers: 50,
            default_config: CircuitBreakerComponentConfig::default(),
            component_configs: HashMap::new(),
        }
    }
}

impl CircuitBreakerSettings {
    pub fn config_for_component(&self, component_name: &str) -> CircuitBreakerComponentConfig {
        self.component_configs
            .get(component_name)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }

    fn validate(&self) -> ConfigResult<()> {
        let all = std::iter::once(("default_config", &self.default_config)).chain(
            self.component_configs
                .iter()
                .map(|(name, cfg)| (name.as_str(), cfg)),
        );
        for (name, component) in all {
            component
                .to_resilience_config()
                .validate()
                .map_err(|msg| {
                    ConfigurationError::invalid_value(format!("circuit_breakers.{name}"), msg)
                })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter_enabled: bool,
    pub max_jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            jitter_enabled: policy.jitter_enabled,
            max_jitter: policy.max_jitter,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            jitter_enabled: self.jitter_enabled,
            max_jitter: self.max_jitter,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdempotencySettings {
    pub ttl_seconds: u64,
    pub max_capacity: u64,
}

impl Default for IdempotencySettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 24 * 60 * 60,
            max_capacity: 10_000,
        }
    }
}

impl IdempotencySettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.ttl_seconds == 0 || self.max_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "idempotency",
                "ttl_seconds and max_capacity must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Workflow ids registered at the automation system, one per category
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowIds {
    pub strategy: Option<String>,
    pub copywriting: Option<String>,
    pub video_production: Option<String>,
    pub voiceover_synthesis: Option<String>,
    pub image_generation: Option<String>,
    pub review: Option<String>,
}

/// HTTP endpoint backing a synchronous agent capability
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CapabilityEndpoint {
    pub url: String,
    #[serde(default = "default_capability_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_capability_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Automation system base URL; async dispatch is disabled when unset
    pub automation_base_url: Option<String>,
    pub automation_api_key: Option<String>,
    pub workflows: WorkflowIds,
    pub video_timeout_ms: u64,
    pub image_timeout_ms: u64,
    pub default_timeout_ms: u64,
    pub direct_generation_attempts: u32,
    pub direct_generation_retry_delay_ms: u64,
    /// Synchronous capabilities keyed by agent role name
    pub capabilities: HashMap<String, CapabilityEndpoint>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            automation_base_url: None,
            automation_api_key: None,
            workflows: WorkflowIds::default(),
            video_timeout_ms: 300_000,
            image_timeout_ms: 120_000,
            default_timeout_ms: 30_000,
            direct_generation_attempts: 3,
            direct_generation_retry_delay_ms: 1_000,
            capabilities: HashMap::new(),
        }
    }
}

impl DispatchSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.direct_generation_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "dispatch.direct_generation_attempts",
                "must be greater than 0",
            ));
        }
        for role in self.capabilities.keys() {
            role.parse::<AgentRole>()
                .map_err(|msg| ConfigurationError::invalid_value("dispatch.capabilities", msg))?;
        }
        Ok(())
    }
}

/// Maximum time a task may stay `in_progress`, per role
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskTimeoutSettings {
    pub executive_seconds: u64,
    pub task_planner_seconds: u64,
    pub strategist_seconds: u64,
    pub copywriter_seconds: u64,
    pub producer_seconds: u64,
    pub qa_seconds: u64,
}

impl Default for TaskTimeoutSettings {
    fn default() -> Self {
        Self {
            executive_seconds: 5 * 60,
            task_planner_seconds: 5 * 60,
            strategist_seconds: 30 * 60,
            copywriter_seconds: 30 * 60,
            producer_seconds: 2 * 60 * 60,
            qa_seconds: 5 * 60,
        }
    }
}

impl TaskTimeoutSettings {
    pub fn timeout_for(&self, role: AgentRole) -> Duration {
        let secs = match role {
            AgentRole::Executive => self.executive_seconds,
            AgentRole::TaskPlanner => self.task_planner_seconds,
            AgentRole::Strategist => self.strategist_seconds,
            AgentRole::Copywriter => self.copywriter_seconds,
            AgentRole::Producer => self.producer_seconds,
            AgentRole::Qa => self.qa_seconds,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Postgres URL; the in-memory store is used when unset
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSettings {
    pub bind_address: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}
