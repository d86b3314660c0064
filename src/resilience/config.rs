//! # Circuit Breaker Configuration
//!
//! Per-breaker thresholds. System-wide settings (which breakers exist and
//! their overrides) live in [`crate::config::CircuitBreakerSettings`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failure-rate tripping over a sliding time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowConfig {
    /// How far back outcomes are counted
    pub window: Duration,

    /// Failure ratio (0.0 to 1.0) at which the circuit opens
    pub failure_rate_threshold: f64,

    /// Outcomes required in the window before the ratio is trusted
    pub minimum_calls: u32,
}

impl Default for RollingWindowConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            failure_rate_threshold: 0.5,
            minimum_calls: 10,
        }
    }
}

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,

    /// Cooldown spent open before a trial call is let through
    pub timeout: Duration,

    /// Successful trial calls needed to close from half-open
    pub success_threshold: u32,

    /// Optional failure-rate tripping in addition to consecutive failures
    pub rolling_window: Option<RollingWindowConfig>,
}

impl CircuitBreakerConfig {
    /// External automation system: rate based with a one minute cooldown
    pub fn for_automation() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 1,
            rolling_window: Some(RollingWindowConfig::default()),
        }
    }

    /// Direct generation capabilities: consecutive failures only
    pub fn for_generation() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 1,
            rolling_window: None,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.failure_threshold > 100 {
            return Err("failure_threshold should not exceed 100".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.timeout > Duration::from_secs(600) {
            return Err("timeout should not exceed 600 seconds".to_string());
        }

        if self.success_threshold == 0 {
            return Err("success_threshold must be greater than 0".to_string());
        }

        if let Some(window) = &self.rolling_window {
            if window.window.is_zero() {
                return Err("rolling_window.window must be greater than 0".to_string());
            }
            if !(0.0..=1.0).contains(&window.failure_rate_threshold)
                || window.failure_rate_threshold == 0.0
            {
                return Err("rolling_window.failure_rate_threshold must be in (0, 1]".to_string());
            }
            if window.minimum_calls == 0 {
                return Err("rolling_window.minimum_calls must be greater than 0".to_string());
            }
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 1,
            rolling_window: None,
        }
    }
}
