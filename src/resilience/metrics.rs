//! Breaker counters as served by `/ready`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::resilience::CircuitState;

/// Lifetime failure ratio above which a closed breaker is reported unhealthy
const UNHEALTHY_FAILURE_RATE: f64 = 0.1;

/// Counters of one breaker, copied out under its lock
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Calls that reached the protected operation
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Calls refused while open or while a half-open trial was in flight
    pub rejected_calls: u64,
    pub consecutive_failures: u64,
    /// Successful trial calls since entering half-open
    pub half_open_successes: u64,
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub current_state: CircuitState,
    pub failure_rate: f64,
    /// Failure ratio over the rolling window, when one is configured
    pub window_failure_rate: Option<f64>,
}

impl CircuitBreakerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open is unhealthy. Closed is unhealthy once the lifetime failure
    /// rate or the window rate crosses the reporting threshold.
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
            CircuitState::Closed => {
                let rate = self.window_failure_rate.unwrap_or(self.failure_rate);
                rate < UNHEALTHY_FAILURE_RATE
            }
        }
    }
}

/// Every breaker owned by one manager, keyed by component name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemCircuitBreakerMetrics {
    pub circuit_breakers: HashMap<String, CircuitBreakerMetrics>,
    pub collected_at: DateTime<Utc>,
}

impl SystemCircuitBreakerMetrics {
    /// Component names whose breaker is open, sorted
    pub fn open_circuits(&self) -> Vec<&str> {
        let mut open: Vec<&str> = self
            .circuit_breakers
            .iter()
            .filter(|(_, m)| m.current_state == CircuitState::Open)
            .map(|(name, _)| name.as_str())
            .collect();
        open.sort_unstable();
        open
    }
}
