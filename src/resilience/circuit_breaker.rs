//! # Circuit Breaker Implementation
//!
//! Fault isolation for calls to an external dependency. Three states:
//! Closed (normal operation), Open (failing fast) and Half-Open (a single
//! trial call decides whether to close again).
//!
//! The circuit opens after `failure_threshold` consecutive failures, or, when
//! a rolling window is configured, once the failure ratio inside the window
//! crosses its threshold with enough calls observed.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    #[default]
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - one trial call at a time
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, the operation was not attempted
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation ran and failed
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Trial,
}

#[derive(Debug)]
struct Counters {
    metrics: CircuitBreakerMetrics,
    /// Outcomes inside the rolling window, `true` for success
    window: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
}

/// Releases the half-open trial slot even if the caller's future is dropped
struct TrialSlot<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TrialSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Circuit breaker with atomic state and a mutex-guarded counter block
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: AtomicU8,
    config: CircuitBreakerConfig,
    counters: Mutex<Counters>,
    trial_in_flight: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            timeout_seconds = config.timeout.as_secs(),
            success_threshold = config.success_threshold,
            rolling_window = config.rolling_window.is_some(),
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            counters: Mutex::new(Counters {
                metrics: CircuitBreakerMetrics::new(),
                window: VecDeque::new(),
                opened_at: None,
            }),
            trial_in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// Every error counts as a failure.
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_classified(operation, |_| true).await
    }

    /// Like [`call`](Self::call), but `is_failure` decides which errors count
    /// against the dependency. Errors it rejects (e.g. a 4xx caused by the
    /// caller's own payload) are returned without affecting the circuit.
    pub async fn call_classified<F, T, E, Fut, C>(
        &self,
        operation: F,
        is_failure: C,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&E) -> bool,
    {
        let admission = match self.admit() {
            Some(admission) => admission,
            None => {
                self.counters.lock().metrics.rejected_calls += 1;
                debug!(component = %self.name, "⛔ Call rejected, circuit open");
                return Err(CircuitBreakerError::CircuitOpen {
                    component: self.name.clone(),
                });
            }
        };
        let _slot = (admission == Admission::Trial).then(|| TrialSlot {
            flag: &self.trial_in_flight,
        });

        let start_time = Instant::now();
        let result = operation().await;
        let duration = start_time.elapsed();

        match &result {
            Ok(_) => self.record_success(duration, admission),
            Err(err) if is_failure(err) => self.record_failure(duration, admission),
            Err(_) => self.record_neutral(duration),
        }

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Decide whether a call may proceed, moving Open to HalfOpen once the
    /// cooldown has elapsed.
    fn admit(&self) -> Option<Admission> {
        match self.state() {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::Open => {
                let cooled_down = {
                    let counters = self.counters.lock();
                    match counters.opened_at {
                        Some(opened) => opened.elapsed() >= self.config.timeout,
                        None => {
                            warn!(component = %self.name, "Circuit open but no timestamp recorded");
                            true
                        }
                    }
                };
                if !cooled_down {
                    return None;
                }
                if self
                    .state
                    .compare_exchange(
                        CircuitState::Open as u8,
                        CircuitState::HalfOpen as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    self.counters.lock().metrics.half_open_successes = 0;
                    info!(
                        component = %self.name,
                        "🟡 Circuit breaker half-open (testing recovery)"
                    );
                }
                self.try_trial()
            }
            CircuitState::HalfOpen => self.try_trial(),
        }
    }

    fn try_trial(&self) -> Option<Admission> {
        self.trial_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Admission::Trial)
    }

    fn record_success(&self, duration: Duration, admission: Admission) {
        let mut counters = self.counters.lock();
        let now = Instant::now();
        counters.metrics.total_calls += 1;
        counters.metrics.success_count += 1;
        counters.metrics.total_duration += duration;
        counters.metrics.consecutive_failures = 0;
        self.push_outcome(&mut counters, now, true);

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "🟢 Operation succeeded"
        );

        if admission == Admission::Trial {
            counters.metrics.half_open_successes += 1;
            if counters.metrics.half_open_successes >= self.config.success_threshold as u64 {
                self.close_locked(&mut counters);
            }
        }
    }

    fn record_failure(&self, duration: Duration, admission: Admission) {
        let mut counters = self.counters.lock();
        let now = Instant::now();
        counters.metrics.total_calls += 1;
        counters.metrics.failure_count += 1;
        counters.metrics.total_duration += duration;
        counters.metrics.consecutive_failures += 1;
        self.push_outcome(&mut counters, now, false);

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            consecutive_failures = counters.metrics.consecutive_failures,
            "🔴 Operation failed"
        );

        if admission == Admission::Trial {
            self.open_locked(&mut counters, "trial call failed");
            return;
        }

        if self.state() == CircuitState::Closed {
            if counters.metrics.consecutive_failures >= self.config.failure_threshold as u64 {
                self.open_locked(&mut counters, "consecutive failure threshold reached");
            } else if self.window_tripped(&counters) {
                self.open_locked(&mut counters, "failure rate threshold crossed");
            }
        }
    }

    fn record_neutral(&self, duration: Duration) {
        let mut counters = self.counters.lock();
        counters.metrics.total_calls += 1;
        counters.metrics.total_duration += duration;
    }

    fn push_outcome(&self, counters: &mut Counters, now: Instant, success: bool) {
        let Some(window) = &self.config.rolling_window else {
            return;
        };
        counters.window.push_back((now, success));
        while let Some((at, _)) = counters.window.front() {
            if now.duration_since(*at) > window.window {
                counters.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn window_failure_rate(&self, counters: &Counters) -> Option<f64> {
        self.config.rolling_window.as_ref()?;
        if counters.window.is_empty() {
            return Some(0.0);
        }
        let failures = counters.window.iter().filter(|(_, ok)| !ok).count();
        Some(failures as f64 / counters.window.len() as f64)
    }

    fn window_tripped(&self, counters: &Counters) -> bool {
        let Some(window) = &self.config.rolling_window else {
            return false;
        };
        if counters.window.len() < window.minimum_calls as usize {
            return false;
        }
        self.window_failure_rate(counters)
            .is_some_and(|rate| rate >= window.failure_rate_threshold)
    }

    fn open_locked(&self, counters: &mut Counters, reason: &str) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        counters.opened_at = Some(Instant::now());
        counters.metrics.half_open_successes = 0;

        error!(
            component = %self.name,
            reason = reason,
            consecutive_failures = counters.metrics.consecutive_failures,
            timeout_seconds = self.config.timeout.as_secs(),
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    fn close_locked(&self, counters: &mut Counters) {
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
        counters.opened_at = None;
        counters.metrics.consecutive_failures = 0;
        counters.metrics.half_open_successes = 0;
        counters.window.clear();

        info!(
            component = %self.name,
            total_calls = counters.metrics.total_calls,
            "🟢 Circuit breaker closed (recovered)"
        );
    }

    /// Force circuit to open state
    pub fn force_open(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        let mut counters = self.counters.lock();
        self.open_locked(&mut counters, "forced");
    }

    /// Force circuit to closed state
    pub fn force_closed(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced closed");
        let mut counters = self.counters.lock();
        self.close_locked(&mut counters);
    }

    /// Current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let counters = self.counters.lock();
        let mut snapshot = counters.metrics.clone();
        snapshot.current_state = self.state();
        snapshot.window_failure_rate = self.window_failure_rate(&counters);

        let judged = snapshot.success_count + snapshot.failure_count;
        if judged > 0 {
            snapshot.failure_rate = snapshot.failure_count as f64 / judged as f64;
        }
        if snapshot.total_calls > 0 {
            snapshot.average_duration = snapshot.total_duration / snapshot.total_calls as u32;
        }
        snapshot
    }

    pub fn is_healthy(&self) -> bool {
        self.metrics().is_healthy()
    }
}
