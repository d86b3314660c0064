//! # Request Orchestrator
//!
//! Drives a content request from submission to `published` or `cancelled`.
//!
//! ## Overview
//!
//! The orchestrator owns no workers. It builds the task graph, hands ready
//! tasks to the [`DispatchAdapter`], and applies outcomes as they come back,
//! either inline from a direct capability or later through a callback.
//!
//! ## Paths
//!
//! - **Submit**: persist the request with all tasks `pending`, move it
//!   `intake -> draft`, run a processing pass.
//! - **Process**: dispatch every ready task; repeat while inline results keep
//!   unlocking more work, up to `max_processing_iterations` rounds.
//! - **Resume**: apply one outcome. Re-reads state and does nothing unless
//!   the task is `in_progress` and the request is live, so duplicate and late
//!   deliveries are harmless.
//!
//! ## Concurrency
//!
//! Processing passes and resumes for one request are serialised by an
//! in-process lock. Every status write is still a compare-and-swap on the
//! status last read, which is what makes concurrent processes safe.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::lifecycle::{status_for_started_role, RequestLifecycle};
use super::progress::ProgressSnapshot;
use super::ready_task_discovery::ReadyTaskDiscovery;
use super::task_graph::TaskGraphFactory;
use super::types::{
    CallbackAck, CallbackPayload, ProcessingSummary, RequestView, ResumeResult, SubmissionResult,
    TaskOutcome,
};
use crate::config::OrchestrationSettings;
use crate::dispatch::{
    DispatchAdapter, DispatchError, DispatchOutcome, ExecutionMatch, AUTOMATION_COMPONENT,
};
use crate::error::{OrchestratorError, Result};
use crate::events::EventLog;
use crate::logging::{log_request_operation, log_task_operation};
use crate::models::{
    AgentRole, ContentRequest, NewContentRequest, RequestEvent, RequestTask, StageOutput,
};
use crate::resilience::Retryable;
use crate::state_machine::{validate_task_transition, RequestStatus, TaskStatus};
use crate::store::{CasResult, RequestStore, TaskUpdate};

const ORCHESTRATOR_ACTOR: &str = "orchestrator";
const INVALID_OUTPUT_CODE: &str = "INVALID_OUTPUT";

/// What happened to one ready task during a processing pass
#[derive(Debug)]
enum TaskDispatch {
    /// Sent to the automation system; a callback will follow
    Dispatched,
    /// Resolved inline
    Resolved(ResumeResult),
    /// Returned to `pending` because a circuit is open
    Deferred,
    /// Another writer claimed the task first
    Skipped,
}

pub struct RequestOrchestrator {
    store: Arc<dyn RequestStore>,
    dispatcher: Arc<DispatchAdapter>,
    events: EventLog,
    lifecycle: RequestLifecycle,
    settings: OrchestrationSettings,
    request_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for RequestOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("dispatcher", &self.dispatcher)
            .field("settings", &self.settings)
            .field("locked_requests", &self.request_locks.len())
            .finish()
    }
}

impl RequestOrchestrator {
    pub fn new(
        store: Arc<dyn RequestStore>,
        dispatcher: Arc<DispatchAdapter>,
        events: EventLog,
        settings: OrchestrationSettings,
    ) -> Self {
        let lifecycle = RequestLifecycle::new(store.clone(), events.clone());
        Self {
            store,
            dispatcher,
            events,
            lifecycle,
            settings,
            request_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RequestStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<DispatchAdapter> {
        &self.dispatcher
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn settings(&self) -> &OrchestrationSettings {
        &self.settings
    }

    fn request_lock(&self, request_id: Uuid) -> Arc<Mutex<()>> {
        self.request_locks.entry(request_id).or_default().clone()
    }

    async fn load_request(&self, request_id: Uuid) -> Result<ContentRequest> {
        self.store
            .get_request(request_id)
            .await?
            .ok_or(OrchestratorError::RequestNotFound(request_id))
    }

    async fn load_task(&self, task_id: Uuid) -> Result<RequestTask> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or(OrchestratorError::TaskNotFound(task_id))
    }

    /// Create a request and its task graph, then start processing.
    ///
    /// The returned status is whatever the first pass left behind: `draft`
    /// while the first task is out with the automation system, further along
    /// when direct capabilities resolved work inline.
    #[instrument(skip(self, new_request), fields(request_type = %new_request.request_type))]
    pub async fn submit(&self, new_request: NewContentRequest) -> Result<SubmissionResult> {
        let request = new_request.into_request()?;
        let tasks = TaskGraphFactory::build_tasks(&request);
        self.store.create_request_with_tasks(&request, &tasks).await?;

        self.events
            .request_created(request.id, request.request_type.as_str(), tasks.len())
            .await;
        log_request_operation(
            "submit",
            request.id,
            Some(request.request_type.as_str()),
            "intake",
            Some(&format!("{} tasks", tasks.len())),
        );

        self.lifecycle
            .transition(
                request.id,
                RequestStatus::Intake,
                RequestStatus::Draft,
                "task graph created",
            )
            .await?;

        let summary = self.process_request(request.id).await?;
        Ok(SubmissionResult {
            request_id: request.id,
            status: summary.final_status,
            task_count: tasks.len(),
        })
    }

    pub async fn get_request(&self, request_id: Uuid) -> Result<RequestView> {
        let request = self.load_request(request_id).await?;
        let tasks = self.store.list_tasks(request_id).await?;
        Ok(RequestView { request, tasks })
    }

    pub async fn progress(&self, request_id: Uuid) -> Result<ProgressSnapshot> {
        let request = self.load_request(request_id).await?;
        let tasks = self.store.list_tasks(request_id).await?;
        Ok(ProgressSnapshot::build(&request, &tasks))
    }

    pub async fn events(&self, request_id: Uuid) -> Result<Vec<RequestEvent>> {
        self.load_request(request_id).await?;
        Ok(self.events.events_for(request_id).await?)
    }

    /// Dispatch every ready task of a request
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn process_request(&self, request_id: Uuid) -> Result<ProcessingSummary> {
        let lock = self.request_lock(request_id);
        let summary = {
            let _guard = lock.lock().await;
            self.process_locked(request_id).await?
        };
        if summary.final_status.is_terminal() {
            self.request_locks.remove(&request_id);
        }
        Ok(summary)
    }

    async fn process_locked(&self, request_id: Uuid) -> Result<ProcessingSummary> {
        let mut summary = ProcessingSummary::default();
        let max_iterations = self.settings.max_processing_iterations.max(1);

        for iteration in 1..=max_iterations {
            summary.iterations = iteration;
            let request = self.load_request(request_id).await?;
            if request.is_terminal() {
                break;
            }

            let tasks = self.store.list_tasks(request_id).await?;
            let ready = ReadyTaskDiscovery::find_ready(&tasks);
            if ready.is_empty() {
                break;
            }

            let mut resolved_inline = false;
            for task in ready {
                match self.start_and_dispatch(&request, task, &tasks).await? {
                    TaskDispatch::Dispatched => summary.dispatched += 1,
                    TaskDispatch::Resolved(result) => {
                        resolved_inline = true;
                        match result {
                            ResumeResult::Completed => summary.completed_inline += 1,
                            ResumeResult::RetryScheduled { .. } | ResumeResult::Failed => {
                                summary.failed += 1
                            }
                            ResumeResult::Ignored { .. } => {}
                        }
                    }
                    TaskDispatch::Deferred => summary.deferred += 1,
                    TaskDispatch::Skipped => {}
                }
            }

            if !resolved_inline {
                break;
            }
            if iteration == max_iterations {
                warn!(
                    request_id = %request_id,
                    max_iterations = max_iterations,
                    "Processing pass hit its iteration bound; remaining work waits for the next pass"
                );
            }
        }

        summary.final_status = self.load_request(request_id).await?.status;
        debug!(request_id = %request_id, summary = ?summary, "Processing pass finished");
        Ok(summary)
    }

    async fn start_and_dispatch(
        &self,
        request: &ContentRequest,
        task: RequestTask,
        tasks: &[RequestTask],
    ) -> Result<TaskDispatch> {
        let now = Utc::now();
        let update = TaskUpdate::start(now);
        match self
            .store
            .cas_task(task.id, TaskStatus::Pending, update.clone())
            .await?
        {
            CasResult::Success => {}
            CasResult::NotFound => return Err(OrchestratorError::TaskNotFound(task.id)),
            CasResult::StateMismatch { actual } => {
                debug!(task_id = %task.id, actual = %actual, "Task claimed elsewhere");
                return Ok(TaskDispatch::Skipped);
            }
        }

        let mut started = task;
        update.apply(&mut started, now);
        self.events.task_started(&started).await;
        log_task_operation(
            "start",
            started.request_id,
            started.id,
            started.agent_role.as_str(),
            "in_progress",
            Some(&format!("attempt {}", started.retry_count + 1)),
        );

        if let Some(target) = status_for_started_role(started.agent_role) {
            self.lifecycle
                .advance_to(
                    request.id,
                    target,
                    &format!("{} task started", started.agent_role),
                )
                .await?;
        }

        match self.dispatcher.dispatch(request, &started, tasks).await {
            Ok(DispatchOutcome::Dispatched(dispatch)) => {
                info!(
                    task_id = %started.id,
                    execution_id = %dispatch.execution_id,
                    "📤 Task dispatched to automation"
                );
                Ok(TaskDispatch::Dispatched)
            }
            Ok(DispatchOutcome::Completed { output, output_url }) => {
                let result = self
                    .apply_outcome(started.id, TaskOutcome::Completed { output, output_url }, None)
                    .await?;
                Ok(TaskDispatch::Resolved(result))
            }
            Ok(DispatchOutcome::Failed {
                code,
                message,
                retriable,
            }) => {
                let result = self
                    .apply_outcome(started.id, TaskOutcome::failed(code, message, retriable), None)
                    .await?;
                Ok(TaskDispatch::Resolved(result))
            }
            Err(DispatchError::CircuitOpen { component }) => {
                self.defer(&started, &component).await?;
                Ok(TaskDispatch::Deferred)
            }
            Err(err) => {
                let outcome = TaskOutcome::failed(err.code(), err.to_string(), err.is_retryable());
                let result = self.apply_outcome(started.id, outcome, None).await?;
                Ok(TaskDispatch::Resolved(result))
            }
        }
    }

    /// Return a task to `pending` without consuming a pipeline retry
    async fn defer(&self, task: &RequestTask, component: &str) -> Result<()> {
        let update = TaskUpdate::requeue(task.retry_count, task.error_message.clone());
        if self
            .store
            .cas_task(task.id, TaskStatus::InProgress, update)
            .await?
            .is_success()
        {
            let reason = format!("circuit open for {component}");
            warn!(task_id = %task.id, component = component, "⏸️ Dispatch deferred");
            self.events
                .dispatch_deferred(task.request_id, task.id, task.agent_role, &reason)
                .await;
        }
        Ok(())
    }

    /// Apply an outcome delivered outside a processing pass, then continue
    /// processing the request.
    pub async fn resume(&self, task_id: Uuid, outcome: TaskOutcome) -> Result<ResumeResult> {
        self.resume_with(task_id, outcome, None).await
    }

    async fn resume_with(
        &self,
        task_id: Uuid,
        outcome: TaskOutcome,
        execution_id: Option<&str>,
    ) -> Result<ResumeResult> {
        let task = self.load_task(task_id).await?;
        let lock = self.request_lock(task.request_id);
        let result = {
            let _guard = lock.lock().await;
            self.apply_outcome(task_id, outcome, execution_id).await?
        };

        if result.applied() {
            self.process_request(task.request_id).await?;
        }
        Ok(result)
    }

    /// Apply one outcome to an `in_progress` task. Caller holds the request lock.
    async fn apply_outcome(
        &self,
        task_id: Uuid,
        outcome: TaskOutcome,
        execution_id: Option<&str>,
    ) -> Result<ResumeResult> {
        let task = self.load_task(task_id).await?;
        let request = self.load_request(task.request_id).await?;

        if request.is_terminal() {
            info!(
                request_id = %request.id,
                task_id = %task.id,
                status = %request.status,
                "Outcome for finished request acknowledged without changes"
            );
            return Ok(ResumeResult::ignored(format!("request is {}", request.status)));
        }
        if task.status != TaskStatus::InProgress {
            debug!(task_id = %task.id, status = %task.status, "Outcome for settled task ignored");
            return Ok(ResumeResult::ignored(format!("task is {}", task.status)));
        }
        if let Some(execution_id) = execution_id {
            if let ExecutionMatch::Stale { expected } =
                self.dispatcher.tracker().check_execution(task.id, execution_id)
            {
                warn!(
                    task_id = %task.id,
                    execution_id = execution_id,
                    expected = %expected,
                    "Callback for superseded execution ignored"
                );
                return Ok(ResumeResult::ignored(format!(
                    "stale execution {execution_id}; current is {expected}"
                )));
            }
        }

        match outcome {
            TaskOutcome::Completed { output, output_url } => {
                self.complete_task(&task, output, output_url).await
            }
            TaskOutcome::Failed {
                code,
                message,
                retriable,
            } => self.fail_task(&task, &code, &message, retriable).await,
        }
    }

    async fn complete_task(
        &self,
        task: &RequestTask,
        output: Value,
        output_url: Option<String>,
    ) -> Result<ResumeResult> {
        let output = match output {
            Value::Object(_) => output,
            other => json!({ "result": other }),
        };
        let output_url = output_url.or_else(|| {
            output
                .get("output_url")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        let mut candidate = output.clone();
        if let (Some(url), Some(obj)) = (&output_url, candidate.as_object_mut()) {
            obj.entry("output_url")
                .or_insert_with(|| Value::String(url.clone()));
        }
        if let Err(err) = StageOutput::parse(task.agent_role, candidate) {
            warn!(
                request_id = %task.request_id,
                task_id = %task.id,
                agent_role = %task.agent_role,
                error = %err,
                "⚠️ Completed output rejected"
            );
            return self
                .fail_task(task, INVALID_OUTPUT_CODE, &err.to_string(), true)
                .await;
        }

        let now = Utc::now();
        let update = TaskUpdate::complete(output.clone(), output_url, now);
        if !self
            .store
            .cas_task(task.id, TaskStatus::InProgress, update.clone())
            .await?
            .is_success()
        {
            return Ok(ResumeResult::ignored("task already resolved"));
        }
        self.dispatcher.tracker().resolve(task.id);

        let mut completed = task.clone();
        update.apply(&mut completed, now);
        self.events
            .task_completed(&completed, completed.duration_ms(), &output)
            .await;
        log_task_operation(
            "complete",
            completed.request_id,
            completed.id,
            completed.agent_role.as_str(),
            "completed",
            None,
        );

        if completed.agent_role == AgentRole::Qa {
            let tasks = self.store.list_tasks(completed.request_id).await?;
            if ReadyTaskDiscovery::all_terminal(&tasks) {
                self.lifecycle
                    .advance_to(
                        completed.request_id,
                        RequestStatus::Published,
                        "quality review passed",
                    )
                    .await?;
            }
        }
        Ok(ResumeResult::Completed)
    }

    async fn fail_task(
        &self,
        task: &RequestTask,
        code: &str,
        message: &str,
        retriable: bool,
    ) -> Result<ResumeResult> {
        let error_message = format!("{code}: {message}");
        let max_retries = self.settings.max_task_retries;
        let retries_used = u32::try_from(task.retry_count).unwrap_or(0);

        if task.retryable && retriable && retries_used < max_retries {
            let retry_count = task.retry_count + 1;
            let update = TaskUpdate::requeue(retry_count, Some(error_message.clone()));
            if !self
                .store
                .cas_task(task.id, TaskStatus::InProgress, update)
                .await?
                .is_success()
            {
                return Ok(ResumeResult::ignored("task already resolved"));
            }
            self.dispatcher.tracker().forget(task.id);
            self.events.task_failed(task, code, message, retriable).await;
            self.events
                .task_retry_scheduled(task, retry_count, max_retries)
                .await;
            log_task_operation(
                "retry_scheduled",
                task.request_id,
                task.id,
                task.agent_role.as_str(),
                "pending",
                Some(&format!("retry {retry_count}/{max_retries} after {error_message}")),
            );
            return Ok(ResumeResult::RetryScheduled { retry_count });
        }

        let now = Utc::now();
        if !self
            .store
            .cas_task(
                task.id,
                TaskStatus::InProgress,
                TaskUpdate::fail(error_message.clone(), now),
            )
            .await?
            .is_success()
        {
            return Ok(ResumeResult::ignored("task already resolved"));
        }
        self.dispatcher.tracker().forget(task.id);
        self.events.task_failed(task, code, message, retriable).await;
        if task.retryable {
            self.events.task_dead_lettered(task, &error_message).await;
        }
        error!(
            request_id = %task.request_id,
            task_id = %task.id,
            agent_role = %task.agent_role,
            error = %error_message,
            "❌ Task failed permanently"
        );

        let reason = format!("task '{}' failed: {error_message}", task.name);
        self.cancel_locked(task.request_id, &reason, ORCHESTRATOR_ACTOR)
            .await?;
        Ok(ResumeResult::Failed)
    }

    /// Cancel the request first so late outcomes see a terminal request,
    /// then settle every unfinished task.
    async fn cancel_locked(&self, request_id: Uuid, reason: &str, cancelled_by: &str) -> Result<bool> {
        let cancelled = self.lifecycle.cancel(request_id, reason).await?;

        let now = Utc::now();
        for task in self.store.list_tasks(request_id).await? {
            let update = match task.status {
                TaskStatus::Pending => TaskUpdate::cancel(None, now),
                TaskStatus::InProgress => {
                    TaskUpdate::cancel(Some(format!("CANCELLED: {reason}")), now)
                }
                _ => continue,
            };
            self.store.cas_task(task.id, task.status, update).await?;
            self.dispatcher.tracker().forget(task.id);
        }

        if cancelled {
            self.events
                .request_cancelled(request_id, reason, cancelled_by)
                .await;
            log_request_operation("cancel", request_id, None, "cancelled", Some(reason));
        }
        Ok(cancelled)
    }

    /// Handle a completion callback from the automation system.
    ///
    /// Unknown tasks, or tasks that do not belong to the named request, are
    /// errors. Everything else is acknowledged; `applied` tells whether state
    /// changed.
    #[instrument(skip(self, payload), fields(task_id = %payload.task_id, execution_id = %payload.execution_id))]
    pub async fn handle_callback(&self, payload: CallbackPayload) -> Result<CallbackAck> {
        let task = self.load_task(payload.task_id).await?;
        if task.request_id != payload.request_id {
            warn!(
                task_id = %task.id,
                claimed_request = %payload.request_id,
                "Callback names a request that does not own the task"
            );
            return Err(OrchestratorError::TaskNotFound(payload.task_id));
        }

        let outcome = payload.to_outcome();
        self.events
            .provider_callback_received(
                task.request_id,
                task.id,
                AUTOMATION_COMPONENT,
                &payload.execution_id,
                outcome.label(),
            )
            .await;

        let result = self
            .resume_with(task.id, outcome, Some(&payload.execution_id))
            .await?;
        Ok(match result {
            ResumeResult::Completed => CallbackAck::applied("task completed"),
            ResumeResult::RetryScheduled { retry_count } => {
                CallbackAck::applied(format!("task failed; retry {retry_count} scheduled"))
            }
            ResumeResult::Failed => CallbackAck::applied("task failed; request cancelled"),
            ResumeResult::Ignored { reason } => CallbackAck::noop(reason),
        })
    }

    /// Operator cancellation of a live request
    #[instrument(skip(self))]
    pub async fn cancel_request(
        &self,
        request_id: Uuid,
        reason: &str,
        cancelled_by: &str,
    ) -> Result<ContentRequest> {
        let lock = self.request_lock(request_id);
        {
            let _guard = lock.lock().await;
            let request = self.load_request(request_id).await?;
            if request.is_terminal() {
                return Err(OrchestratorError::RequestTerminal {
                    request_id,
                    status: request.status,
                });
            }
            self.cancel_locked(request_id, reason, cancelled_by).await?;
        }
        self.request_locks.remove(&request_id);
        self.load_request(request_id).await
    }

    /// Operator retry of a failed task on a live request
    #[instrument(skip(self))]
    pub async fn retry_task(&self, task_id: Uuid) -> Result<RequestTask> {
        let request_id = self.load_task(task_id).await?.request_id;
        let lock = self.request_lock(request_id);
        {
            let _guard = lock.lock().await;
            let task = self.load_task(task_id).await?;
            let request = self.load_request(request_id).await?;
            if request.is_terminal() {
                return Err(OrchestratorError::RequestTerminal {
                    request_id,
                    status: request.status,
                });
            }
            if task.status != TaskStatus::Failed {
                return Err(OrchestratorError::TaskNotReady {
                    task_id,
                    reason: format!("task is {}; only failed tasks can be retried", task.status),
                });
            }
            let max_retries = self.settings.max_task_retries;
            if u32::try_from(task.retry_count).unwrap_or(0) >= max_retries {
                return Err(OrchestratorError::TaskNotReady {
                    task_id,
                    reason: format!("retry budget exhausted ({}/{max_retries})", task.retry_count),
                });
            }
            validate_task_transition(task_id, task.status, TaskStatus::Pending)?;

            let retry_count = task.retry_count + 1;
            let update = TaskUpdate::requeue(retry_count, task.error_message.clone());
            if !self
                .store
                .cas_task(task_id, TaskStatus::Failed, update)
                .await?
                .is_success()
            {
                return Err(OrchestratorError::TaskNotReady {
                    task_id,
                    reason: "task changed during retry".to_string(),
                });
            }
            self.events
                .task_retry_scheduled(&task, retry_count, max_retries)
                .await;
            log_task_operation(
                "manual_retry",
                request_id,
                task_id,
                task.agent_role.as_str(),
                "pending",
                None,
            );
        }

        self.process_request(request_id).await?;
        self.load_task(task_id).await
    }

    /// Send a request in review back to `draft`, resetting `from_role`'s task
    /// and everything after it.
    #[instrument(skip(self))]
    pub async fn request_rework(
        &self,
        request_id: Uuid,
        from_role: AgentRole,
        reason: &str,
    ) -> Result<ContentRequest> {
        let lock = self.request_lock(request_id);
        {
            let _guard = lock.lock().await;
            let request = self.load_request(request_id).await?;
            if request.status != RequestStatus::Qa {
                return Err(OrchestratorError::IllegalTransition {
                    from: request.status,
                    to: RequestStatus::Draft,
                    suggested: None,
                });
            }

            let tasks = self.store.list_tasks(request_id).await?;
            let anchor = tasks
                .iter()
                .find(|t| t.agent_role == from_role)
                .map(|t| t.sequence_order)
                .ok_or_else(|| {
                    OrchestratorError::Validation(format!(
                        "role {from_role} is not part of this request"
                    ))
                })?;

            for task in tasks.iter().filter(|t| t.sequence_order >= anchor) {
                if task.status == TaskStatus::Pending {
                    continue;
                }
                validate_task_transition(task.id, task.status, TaskStatus::Pending)?;
                let reset = self
                    .store
                    .cas_task(task.id, task.status, TaskUpdate::requeue(0, None))
                    .await?;
                if !reset.is_success() {
                    return Err(OrchestratorError::TaskNotReady {
                        task_id: task.id,
                        reason: "task changed during rework".to_string(),
                    });
                }
                self.dispatcher.tracker().forget(task.id);
            }

            self.lifecycle
                .transition(
                    request_id,
                    RequestStatus::Qa,
                    RequestStatus::Draft,
                    &format!("rework from {from_role}: {reason}"),
                )
                .await?;
            log_request_operation("rework", request_id, None, "draft", Some(reason));
        }

        self.process_request(request_id).await?;
        self.load_request(request_id).await
    }
}
