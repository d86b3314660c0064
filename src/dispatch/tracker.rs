use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{DispatchStatus, ProviderDispatch};

/// Process-local correlation of outstanding dispatches to tasks, keyed by
/// task id. Lost on restart; callbacks without a record are accepted.
#[derive(Debug, Default)]
pub struct DispatchTracker {
    dispatches: DashMap<Uuid, ProviderDispatch>,
}

/// How a callback's execution id relates to the recorded dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMatch {
    Matches,
    /// No record for the task (never dispatched here, or process restarted)
    Untracked,
    Stale { expected: String },
}

impl DispatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, dispatch: ProviderDispatch) {
        self.dispatches.insert(dispatch.task_id, dispatch);
    }

    pub fn get(&self, task_id: Uuid) -> Option<ProviderDispatch> {
        self.dispatches.get(&task_id).map(|d| d.clone())
    }

    pub fn check_execution(&self, task_id: Uuid, execution_id: &str) -> ExecutionMatch {
        match self.dispatches.get(&task_id) {
            None => ExecutionMatch::Untracked,
            Some(d) if d.matches_execution(execution_id) => ExecutionMatch::Matches,
            Some(d) => ExecutionMatch::Stale {
                expected: d.execution_id.clone(),
            },
        }
    }

    pub fn resolve(&self, task_id: Uuid) {
        if let Some(mut dispatch) = self.dispatches.get_mut(&task_id) {
            dispatch.status = DispatchStatus::Resolved;
        }
    }

    pub fn forget(&self, task_id: Uuid) {
        self.dispatches.remove(&task_id);
    }

    pub fn outstanding(&self) -> usize {
        self.dispatches
            .iter()
            .filter(|d| d.status == DispatchStatus::Dispatched)
            .count()
    }
}
