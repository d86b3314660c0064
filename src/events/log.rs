//! Append-only audit writer.
//!
//! Every method is fire-and-forget: a store failure is logged and swallowed
//! so auditing can never change the outcome of an orchestration step.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::publisher::EventPublisher;
use super::types::{output_preview, EventType};
use crate::models::{AgentRole, NewRequestEvent, RequestEvent, RequestTask};
use crate::state_machine::RequestStatus;
use crate::store::{RequestStore, StoreResult};

#[derive(Clone)]
pub struct EventLog {
    store: Arc<dyn RequestStore>,
    publisher: EventPublisher,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("subscribers", &self.publisher.subscriber_count())
            .finish()
    }
}

impl EventLog {
    pub fn new(store: Arc<dyn RequestStore>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub async fn events_for(&self, request_id: Uuid) -> StoreResult<Vec<RequestEvent>> {
        self.store.list_events(request_id).await
    }

    /// Append one event; errors are logged, never returned
    pub async fn record(
        &self,
        request_id: Uuid,
        task_id: Option<Uuid>,
        event_type: EventType,
        payload: Value,
    ) {
        let event = NewRequestEvent {
            request_id,
            task_id,
            event_type: event_type.to_string(),
            payload,
        }
        .into_event();

        if let Err(err) = self.store.append_event(&event).await {
            warn!(
                request_id = %request_id,
                event_type = %event_type,
                error = %err,
                "⚠️ Failed to append request event"
            );
            return;
        }
        self.publisher.publish(event);
    }

    pub async fn request_created(&self, request_id: Uuid, request_type: &str, task_count: usize) {
        self.record(
            request_id,
            None,
            EventType::RequestCreated,
            json!({ "request_type": request_type, "task_count": task_count }),
        )
        .await;
    }

    pub async fn status_changed(
        &self,
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        reason: &str,
    ) {
        self.record(
            request_id,
            None,
            EventType::StatusChanged,
            json!({ "from": from, "to": to, "reason": reason }),
        )
        .await;
    }

    pub async fn request_cancelled(&self, request_id: Uuid, reason: &str, cancelled_by: &str) {
        self.record(
            request_id,
            None,
            EventType::RequestCancelled,
            json!({ "reason": reason, "cancelled_by": cancelled_by }),
        )
        .await;
    }

    pub async fn task_started(&self, task: &RequestTask) {
        self.record(
            task.request_id,
            Some(task.id),
            EventType::TaskStarted,
            json!({
                "task_name": task.name,
                "agent_role": task.agent_role,
                "attempt": task.retry_count + 1,
            }),
        )
        .await;
    }

    pub async fn task_completed(
        &self,
        task: &RequestTask,
        duration_ms: Option<i64>,
        output: &Value,
    ) {
        self.record(
            task.request_id,
            Some(task.id),
            EventType::TaskCompleted,
            json!({
                "agent_role": task.agent_role,
                "duration_ms": duration_ms,
                "output": output_preview(output),
            }),
        )
        .await;
    }

    pub async fn task_failed(
        &self,
        task: &RequestTask,
        code: &str,
        message: &str,
        retriable: bool,
    ) {
        self.record(
            task.request_id,
            Some(task.id),
            EventType::TaskFailed,
            json!({
                "agent_role": task.agent_role,
                "error_code": code,
                "error_message": message,
                "retriable": retriable,
            }),
        )
        .await;
    }

    pub async fn task_retry_scheduled(&self, task: &RequestTask, retry_count: i32, max_retries: u32) {
        self.record(
            task.request_id,
            Some(task.id),
            EventType::TaskRetryScheduled,
            json!({
                "agent_role": task.agent_role,
                "retry_count": retry_count,
                "max_retries": max_retries,
            }),
        )
        .await;
    }

    pub async fn task_dead_lettered(&self, task: &RequestTask, last_error: &str) {
        self.record(
            task.request_id,
            Some(task.id),
            EventType::TaskDeadLettered,
            json!({
                "agent_role": task.agent_role,
                "retry_count": task.retry_count,
                "last_error": last_error,
            }),
        )
        .await;
    }

    pub async fn dispatch_deferred(&self, request_id: Uuid, task_id: Uuid, role: AgentRole, reason: &str) {
        self.record(
            request_id,
            Some(task_id),
            EventType::DispatchDeferred,
            json!({ "agent_role": role, "reason": reason }),
        )
        .await;
    }

    pub async fn provider_callback_received(
        &self,
        request_id: Uuid,
        task_id: Uuid,
        provider: &str,
        execution_id: &str,
        outcome: &str,
    ) {
        self.record(
            request_id,
            Some(task_id),
            EventType::ProviderCallbackReceived,
            json!({
                "provider": provider,
                "execution_id": execution_id,
                "outcome": outcome,
            }),
        )
        .await;
    }
}
