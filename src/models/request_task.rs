use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::request_type::AgentRole;
use crate::state_machine::TaskStatus;

/// One node in a request's task graph.
/// Maps to `request_tasks` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTask {
    pub id: Uuid,
    pub request_id: Uuid,
    pub name: String,
    pub agent_role: AgentRole,
    pub sequence_order: i32,
    /// Roles that must have a completed task before this one may run
    pub dependencies: Vec<AgentRole>,
    pub status: TaskStatus,
    pub retryable: bool,
    pub retry_count: i32,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
    pub output_url: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestTask {
    /// A pending task whose every dependency role is already satisfied
    pub fn is_ready(&self, completed_roles: &HashSet<AgentRole>) -> bool {
        self.status == TaskStatus::Pending
            && self
                .dependencies
                .iter()
                .all(|role| completed_roles.contains(role))
    }

    /// Dependency roles not yet satisfied
    pub fn missing_dependencies(&self, completed_roles: &HashSet<AgentRole>) -> Vec<AgentRole> {
        self.dependencies
            .iter()
            .filter(|role| !completed_roles.contains(role))
            .copied()
            .collect()
    }

    /// Wall-clock time between start and completion
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    /// Time since the task entered `in_progress`
    pub fn running_for(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        if self.status != TaskStatus::InProgress {
            return None;
        }
        self.started_at.map(|start| now - start)
    }
}

/// Roles with at least one completed task in `tasks`
pub fn completed_roles(tasks: &[RequestTask]) -> HashSet<AgentRole> {
    tasks
        .iter()
        .filter(|t| t.status.satisfies_dependencies())
        .map(|t| t.agent_role)
        .collect()
}
