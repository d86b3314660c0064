//! # Capability Registry
//!
//! Direct (synchronous) agent capabilities keyed by agent role. The dispatch
//! adapter falls back to a registered capability when no automation workflow
//! is configured for a task.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use content_orchestrator::models::AgentRole;
//! use content_orchestrator::registry::CapabilityRegistry;
//!
//! let registry = CapabilityRegistry::new();
//! assert!(!registry.has(AgentRole::Producer));
//! ```

pub mod capability;
pub mod http_capability;

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub use capability::{AgentCapability, AgentExecutionResult, CapabilityParams};
pub use http_capability::HttpAgentCapability;

use crate::config::DispatchSettings;
use crate::models::AgentRole;

#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: DashMap<AgentRole, Arc<dyn AgentCapability>>,
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("roles", &self.roles())
            .finish()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build HTTP capabilities for every `[dispatch.capabilities.<role>]` entry
    pub fn from_settings(settings: &DispatchSettings, client: reqwest::Client) -> Self {
        let registry = Self::new();
        for (role_name, endpoint) in &settings.capabilities {
            match role_name.parse::<AgentRole>() {
                Ok(role) => {
                    let name = format!("http:{role_name}");
                    registry.register(role, Arc::new(HttpAgentCapability::new(name, endpoint, client.clone())));
                }
                Err(err) => warn!(role = %role_name, error = %err, "Skipping capability with unknown role"),
            }
        }
        registry
    }

    /// Register or replace the capability for `role`
    pub fn register(&self, role: AgentRole, capability: Arc<dyn AgentCapability>) {
        info!(agent_role = %role, capability = capability.name(), "🧩 Capability registered");
        self.capabilities.insert(role, capability);
    }

    pub fn get(&self, role: AgentRole) -> Option<Arc<dyn AgentCapability>> {
        self.capabilities.get(&role).map(|entry| Arc::clone(entry.value()))
    }

    pub fn has(&self, role: AgentRole) -> bool {
        self.capabilities.contains_key(&role)
    }

    pub fn roles(&self) -> Vec<AgentRole> {
        let mut roles: Vec<AgentRole> = self.capabilities.iter().map(|e| *e.key()).collect();
        roles.sort();
        roles
    }
}
