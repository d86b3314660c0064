//! # Ready Task Discovery
//!
//! A task is ready when it is `pending` and every role in its dependency set
//! has at least one `completed` task in the same request. The computation is
//! general: graphs with parallel branches yield several ready tasks at once.

use tracing::debug;

use crate::models::{completed_roles, RequestTask};
use crate::state_machine::TaskStatus;

#[derive(Debug, Default, Clone, Copy)]
pub struct ReadyTaskDiscovery;

impl ReadyTaskDiscovery {
    /// Ready tasks in sequence order
    pub fn find_ready(tasks: &[RequestTask]) -> Vec<RequestTask> {
        let completed = completed_roles(tasks);
        let mut ready: Vec<RequestTask> = tasks
            .iter()
            .filter(|task| task.is_ready(&completed))
            .cloned()
            .collect();
        ready.sort_by_key(|task| task.sequence_order);

        if let Some(first) = ready.first() {
            debug!(
                request_id = %first.request_id,
                ready_count = ready.len(),
                "🔍 Discovered ready tasks"
            );
        }
        ready
    }

    /// True when any task is dispatched and awaiting its result
    pub fn has_in_flight(tasks: &[RequestTask]) -> bool {
        tasks.iter().any(|t| t.status == TaskStatus::InProgress)
    }

    /// True when every task reached a terminal status
    pub fn all_terminal(tasks: &[RequestTask]) -> bool {
        tasks.iter().all(|t| t.status.is_terminal())
    }
}
