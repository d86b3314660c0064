//! # Circuit Breaker Manager
//!
//! Owns one breaker per external dependency, created lazily from the
//! `[circuit_breakers]` configuration. Constructed by the composition root
//! and shared by reference; there is no process-global instance.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CircuitBreakerSettings;
use crate::resilience::{CircuitBreaker, CircuitBreakerMetrics, SystemCircuitBreakerMetrics};

#[derive(Debug)]
pub struct CircuitBreakerManager {
    circuit_breakers: DashMap<String, Arc<CircuitBreaker>>,
    settings: CircuitBreakerSettings,
}

impl CircuitBreakerManager {
    pub fn from_settings(settings: &CircuitBreakerSettings) -> Self {
        info!(
            enabled = settings.enabled,
            components = settings.component_configs.len(),
            "Initializing circuit breaker manager"
        );
        Self {
            circuit_breakers: DashMap::new(),
            settings: settings.clone(),
        }
    }

    /// Breakers can be switched off wholesale, e.g. for local development
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Get or create the circuit breaker for a component
    pub fn get_circuit_breaker(&self, component_name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.circuit_breakers.get(component_name) {
            return Arc::clone(existing.value());
        }

        if self.circuit_breakers.len() >= self.settings.max_circuit_breakers {
            warn!(
                component = component_name,
                current_count = self.circuit_breakers.len(),
                max_allowed = self.settings.max_circuit_breakers,
                "🚨 Maximum circuit breaker limit reached"
            );
        }

        let breaker = self
            .circuit_breakers
            .entry(component_name.to_string())
            .or_insert_with(|| {
                let config = self
                    .settings
                    .config_for_component(component_name)
                    .to_resilience_config();
                Arc::new(CircuitBreaker::new(component_name, config))
            });
        Arc::clone(breaker.value())
    }

    pub fn list_components(&self) -> Vec<String> {
        self.circuit_breakers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn get_component_metrics(&self, component_name: &str) -> Option<CircuitBreakerMetrics> {
        self.circuit_breakers
            .get(component_name)
            .map(|breaker| breaker.metrics())
    }

    pub fn get_system_metrics(&self) -> SystemCircuitBreakerMetrics {
        SystemCircuitBreakerMetrics {
            circuit_breakers: self
                .circuit_breakers
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().metrics()))
                .collect(),
            collected_at: chrono::Utc::now(),
        }
    }

    /// Force open all circuit breakers
    pub fn force_open_all(&self) {
        warn!("🚨 Forcing all circuit breakers open");
        for entry in self.circuit_breakers.iter() {
            entry.value().force_open();
        }
    }

    /// Force close all circuit breakers
    pub fn force_close_all(&self) {
        warn!("🚨 Forcing all circuit breakers closed");
        for entry in self.circuit_breakers.iter() {
            entry.value().force_closed();
        }
    }
}
