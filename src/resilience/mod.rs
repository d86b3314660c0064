//! # Resilience Module
//!
//! Fault tolerance primitives wrapped around every call to an external
//! dependency:
//!
//! - **Circuit breakers**: stop calling a failing dependency for a cooldown
//! - **Retry**: exponential backoff with jitter for transient errors
//! - **Idempotency**: bounded cache of results keyed by idempotency key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use content_orchestrator::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let circuit_breaker = CircuitBreaker::new("automation", CircuitBreakerConfig::for_automation());
//!
//! let result = circuit_breaker
//!     .call(|| async { Ok::<&str, std::io::Error>("dispatched") })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod idempotency;
pub mod manager;
pub mod metrics;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use config::{CircuitBreakerConfig, RollingWindowConfig};
pub use idempotency::{generate_key, Cached, IdempotencyCache};
pub use manager::CircuitBreakerManager;
pub use metrics::{CircuitBreakerMetrics, SystemCircuitBreakerMetrics};
pub use retry::{retry_with_backoff, RetryPolicy, Retryable};
