//! In-memory [`RequestStore`] for tests and database-less runs.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{CasResult, RequestStore, StoreResult, TaskUpdate};
use crate::models::{ContentRequest, RequestEvent, RequestTask};
use crate::state_machine::{RequestStatus, TaskStatus};

#[derive(Debug, Default)]
struct MemoryState {
    requests: HashMap<Uuid, ContentRequest>,
    tasks: HashMap<Uuid, RequestTask>,
    tasks_by_request: HashMap<Uuid, Vec<Uuid>>,
    events: Vec<RequestEvent>,
}

/// Single lock over all tables, so multi-row writes are atomic
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    state: RwLock<MemoryState>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.state.read().requests.len()
    }

    pub fn event_count(&self) -> usize {
        self.state.read().events.len()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn create_request_with_tasks(
        &self,
        request: &ContentRequest,
        tasks: &[RequestTask],
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        state.requests.insert(request.id, request.clone());
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            ids.push(task.id);
            state.tasks.insert(task.id, task.clone());
        }
        state.tasks_by_request.insert(request.id, ids);
        Ok(())
    }

    async fn get_request(&self, request_id: Uuid) -> StoreResult<Option<ContentRequest>> {
        Ok(self.state.read().requests.get(&request_id).cloned())
    }

    async fn list_active_requests(&self) -> StoreResult<Vec<ContentRequest>> {
        let state = self.state.read();
        let mut active: Vec<ContentRequest> = state
            .requests
            .values()
            .filter(|r| !r.status.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|r| r.created_at);
        Ok(active)
    }

    async fn cas_request_status(
        &self,
        request_id: Uuid,
        expected: RequestStatus,
        target: RequestStatus,
    ) -> StoreResult<CasResult<RequestStatus>> {
        let mut state = self.state.write();
        let Some(request) = state.requests.get_mut(&request_id) else {
            return Ok(CasResult::NotFound);
        };
        if request.status != expected {
            return Ok(CasResult::StateMismatch {
                actual: request.status,
            });
        }
        request.status = target;
        request.updated_at = Utc::now();
        Ok(CasResult::Success)
    }

    async fn get_task(&self, task_id: Uuid) -> StoreResult<Option<RequestTask>> {
        Ok(self.state.read().tasks.get(&task_id).cloned())
    }

    async fn list_tasks(&self, request_id: Uuid) -> StoreResult<Vec<RequestTask>> {
        let state = self.state.read();
        let mut tasks: Vec<RequestTask> = state
            .tasks_by_request
            .get(&request_id)
            .map(|ids| ids.iter().filter_map(|id| state.tasks.get(id)).cloned().collect())
            .unwrap_or_default();
        tasks.sort_by_key(|t| t.sequence_order);
        Ok(tasks)
    }

    async fn list_in_progress_tasks(&self) -> StoreResult<Vec<RequestTask>> {
        let state = self.state.read();
        Ok(state
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::InProgress)
            .cloned()
            .collect())
    }

    async fn cas_task(
        &self,
        task_id: Uuid,
        expected: TaskStatus,
        update: TaskUpdate,
    ) -> StoreResult<CasResult<TaskStatus>> {
        let mut state = self.state.write();
        let Some(task) = state.tasks.get_mut(&task_id) else {
            return Ok(CasResult::NotFound);
        };
        if task.status != expected {
            return Ok(CasResult::StateMismatch {
                actual: task.status,
            });
        }
        update.apply(task, Utc::now());
        Ok(CasResult::Success)
    }

    async fn append_event(&self, event: &RequestEvent) -> StoreResult<()> {
        self.state.write().events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, request_id: Uuid) -> StoreResult<Vec<RequestEvent>> {
        let state = self.state.read();
        Ok(state
            .events
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect())
    }
}
