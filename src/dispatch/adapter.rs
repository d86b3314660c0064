//! # Dispatch Adapter
//!
//! Hands one task to whichever worker can run it.
//!
//! ## Modes
//!
//! - **Asynchronous**: a workflow is configured for the task's category and
//!   an automation client exists. The payload is posted through the
//!   `automation` circuit breaker with retry and an idempotency cache; the
//!   result arrives later by callback.
//! - **Direct**: no workflow, but a capability is registered for the role.
//!   The capability runs inline with fresh seeds per attempt behind the
//!   `generation` breaker and the outcome is terminal.
//!
//! Neither available yields [`DispatchError::WorkflowNotFound`].

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::automation_client::{AutomationClient, WorkflowExecution};
use super::error::DispatchError;
use super::generation::{generate_with_attempts, GenerationResult};
use super::payload::{dispatch_idempotency_key, generation_prompt, image_dimensions, DispatchPayload};
use super::tracker::DispatchTracker;
use super::workflow_registry::{WorkflowRegistry, WorkflowTarget};
use crate::config::OrchestratorConfig;
use crate::logging::log_dispatch_operation;
use crate::models::{AgentRole, ContentRequest, DispatchStatus, ProviderDispatch, RequestTask};
use crate::registry::{AgentCapability, CapabilityParams, CapabilityRegistry};
use crate::resilience::{
    retry_with_backoff, CircuitBreakerError, CircuitBreakerManager, IdempotencyCache, RetryPolicy,
    Retryable,
};

pub const AUTOMATION_COMPONENT: &str = "automation";
pub const GENERATION_COMPONENT: &str = "generation";

/// Result of handing a task to a worker
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Accepted by the automation system; a callback will follow
    Dispatched(ProviderDispatch),
    Completed {
        output: Value,
        output_url: Option<String>,
    },
    Failed {
        code: String,
        message: String,
        retriable: bool,
    },
}

impl DispatchOutcome {
    pub fn from_error(err: &DispatchError) -> Self {
        Self::Failed {
            code: err.code().to_string(),
            message: err.to_string(),
            retriable: err.is_retryable(),
        }
    }
}

pub enum DispatchMode {
    Async(WorkflowTarget),
    Direct(Arc<dyn AgentCapability>),
}

impl std::fmt::Debug for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Async(target) => f.debug_tuple("Async").field(target).finish(),
            Self::Direct(capability) => f.debug_tuple("Direct").field(&capability.name()).finish(),
        }
    }
}

pub struct DispatchAdapter {
    automation: Option<Arc<dyn AutomationClient>>,
    capabilities: Arc<CapabilityRegistry>,
    workflows: WorkflowRegistry,
    breakers: Arc<CircuitBreakerManager>,
    retry_policy: RetryPolicy,
    idempotency: IdempotencyCache<WorkflowExecution>,
    tracker: DispatchTracker,
    callback_base_url: String,
    default_budget_tier: String,
    direct_attempts: u32,
    direct_retry_delay: Duration,
}

impl std::fmt::Debug for DispatchAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchAdapter")
            .field("automation_configured", &self.automation.is_some())
            .field("capabilities", &self.capabilities)
            .field("workflows", &self.workflows)
            .finish()
    }
}

impl DispatchAdapter {
    pub fn new(
        config: &OrchestratorConfig,
        automation: Option<Arc<dyn AutomationClient>>,
        capabilities: Arc<CapabilityRegistry>,
        breakers: Arc<CircuitBreakerManager>,
    ) -> Self {
        Self {
            automation,
            capabilities,
            workflows: WorkflowRegistry::from_settings(&config.dispatch),
            breakers,
            retry_policy: config.retry.to_policy(),
            idempotency: IdempotencyCache::new(
                config.idempotency.max_capacity,
                config.idempotency.ttl(),
            ),
            tracker: DispatchTracker::new(),
            callback_base_url: config.orchestration.callback_base_url.clone(),
            default_budget_tier: config.orchestration.default_budget_tier.clone(),
            direct_attempts: config.dispatch.direct_generation_attempts,
            direct_retry_delay: Duration::from_millis(config.dispatch.direct_generation_retry_delay_ms),
        }
    }

    pub fn tracker(&self) -> &DispatchTracker {
        &self.tracker
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerManager> {
        &self.breakers
    }

    /// Whether the automation system answers its health endpoint
    pub async fn automation_healthy(&self) -> Option<bool> {
        match &self.automation {
            Some(client) => Some(client.health_check().await),
            None => None,
        }
    }

    pub fn mode_for(
        &self,
        request: &ContentRequest,
        task: &RequestTask,
    ) -> Result<DispatchMode, DispatchError> {
        if self.automation.is_some() {
            if let Some(target) =
                self.workflows
                    .resolve(&task.name, task.agent_role, request.request_type)
            {
                return Ok(DispatchMode::Async(target));
            }
        }
        if let Some(capability) = self.capabilities.get(task.agent_role) {
            return Ok(DispatchMode::Direct(capability));
        }
        Err(DispatchError::WorkflowNotFound {
            task_name: task.name.clone(),
            content_type: request.request_type.to_string(),
        })
    }

    /// Dispatch `task`. `tasks` is the request's full task set, used for
    /// upstream outputs. `Err` is returned only for an open circuit or a
    /// failure before anything was sent; the caller decides what that means
    /// for the task.
    #[instrument(skip_all, fields(request_id = %request.id, task_id = %task.id, agent_role = %task.agent_role))]
    pub async fn dispatch(
        &self,
        request: &ContentRequest,
        task: &RequestTask,
        tasks: &[RequestTask],
    ) -> Result<DispatchOutcome, DispatchError> {
        let mode = self.mode_for(request, task)?;
        let payload = DispatchPayload::build(
            request,
            task,
            tasks,
            &self.callback_base_url,
            &self.default_budget_tier,
        )?;

        match mode {
            DispatchMode::Async(target) => self.dispatch_async(task, &target, &payload).await,
            DispatchMode::Direct(capability) => {
                self.dispatch_direct(request, task, capability, &payload).await
            }
        }
    }

    async fn dispatch_async(
        &self,
        task: &RequestTask,
        target: &WorkflowTarget,
        payload: &DispatchPayload,
    ) -> Result<DispatchOutcome, DispatchError> {
        let client = self.automation.as_ref().ok_or(DispatchError::NotConfigured)?;
        let key = dispatch_idempotency_key(task);

        let cached = self
            .idempotency
            .get_or_execute(&key, || self.send_with_resilience(client, target, payload, &key))
            .await;

        let execution = match cached {
            Ok(cached) => {
                if cached.is_hit() {
                    info!(task_id = %task.id, "♻️ Reusing earlier dispatch for identical attempt");
                }
                cached.into_inner()
            }
            Err(shared) => match shared.as_ref() {
                DispatchError::CircuitOpen { component } => {
                    log_dispatch_operation("dispatch", task.id, target.category.as_str(), "circuit_open", None);
                    return Err(DispatchError::CircuitOpen {
                        component: component.clone(),
                    });
                }
                err => {
                    warn!(task_id = %task.id, error = %err, "Automation dispatch failed");
                    log_dispatch_operation(
                        "dispatch",
                        task.id,
                        target.category.as_str(),
                        "failed",
                        Some(&err.to_string()),
                    );
                    return Ok(DispatchOutcome::from_error(err));
                }
            },
        };

        let dispatch = ProviderDispatch {
            request_id: task.request_id,
            task_id: task.id,
            idempotency_key: key,
            workflow_id: execution.workflow_id.clone(),
            execution_id: execution.execution_id.clone(),
            status: DispatchStatus::Dispatched,
            dispatched_at: Utc::now(),
        };
        self.tracker.record(dispatch.clone());
        log_dispatch_operation(
            "dispatch",
            task.id,
            target.category.as_str(),
            "dispatched",
            Some(&execution.execution_id),
        );
        Ok(DispatchOutcome::Dispatched(dispatch))
    }

    async fn send_with_resilience(
        &self,
        client: &Arc<dyn AutomationClient>,
        target: &WorkflowTarget,
        payload: &DispatchPayload,
        key: &str,
    ) -> Result<WorkflowExecution, DispatchError> {
        let breaker = self
            .breakers
            .is_enabled()
            .then(|| self.breakers.get_circuit_breaker(AUTOMATION_COMPONENT));

        retry_with_backoff(&self.retry_policy, "automation_dispatch", |_attempt| {
            let breaker = breaker.clone();
            async move {
                let call = || client.execute_workflow(&target.workflow_id, payload, key, target.timeout);
                match breaker {
                    Some(breaker) => breaker
                        .call_classified(call, |err: &DispatchError| err.is_retryable())
                        .await
                        .map_err(|err| match err {
                            CircuitBreakerError::CircuitOpen { component } => {
                                DispatchError::CircuitOpen { component }
                            }
                            CircuitBreakerError::OperationFailed(err) => err,
                        }),
                    None => call().await,
                }
            }
        })
        .await
    }

    async fn dispatch_direct(
        &self,
        request: &ContentRequest,
        task: &RequestTask,
        capability: Arc<dyn AgentCapability>,
        payload: &DispatchPayload,
    ) -> Result<DispatchOutcome, DispatchError> {
        let (width, height) = if task.agent_role == AgentRole::Producer && request.request_type.is_visual() {
            let (w, h) = image_dimensions(request.setting_str("aspect_ratio"));
            (Some(w), Some(h))
        } else {
            (None, None)
        };
        let params = CapabilityParams {
            request_id: request.id,
            task_id: task.id,
            task_name: task.name.clone(),
            agent_role: task.agent_role,
            request_type: request.request_type,
            prompt: generation_prompt(request),
            seed: 0,
            width,
            height,
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        };
        let timeout = self
            .workflows
            .timeout_for_task(&task.name, task.agent_role, request.request_type);
        let attempts = self.direct_attempts;
        let delay = self.direct_retry_delay;

        let run = || async move {
            match generate_with_attempts(capability, params, attempts, delay, timeout).await {
                GenerationResult::Succeeded { output, output_url, .. } => Ok((output, output_url)),
                GenerationResult::Failed { message, .. } => Err(message),
            }
        };

        let result = if self.breakers.is_enabled() {
            self.breakers
                .get_circuit_breaker(GENERATION_COMPONENT)
                .call(run)
                .await
        } else {
            run().await.map_err(CircuitBreakerError::OperationFailed)
        };

        match result {
            Ok((output, output_url)) => {
                log_dispatch_operation("direct_generation", task.id, GENERATION_COMPONENT, "completed", None);
                Ok(DispatchOutcome::Completed { output, output_url })
            }
            Err(CircuitBreakerError::CircuitOpen { component }) => {
                log_dispatch_operation("direct_generation", task.id, GENERATION_COMPONENT, "circuit_open", None);
                Err(DispatchError::CircuitOpen { component })
            }
            Err(CircuitBreakerError::OperationFailed(message)) => {
                log_dispatch_operation(
                    "direct_generation",
                    task.id,
                    GENERATION_COMPONENT,
                    "failed",
                    Some(&message),
                );
                Ok(DispatchOutcome::Failed {
                    code: "DIRECT_GENERATION_FAILED".to_string(),
                    message,
                    retriable: true,
                })
            }
        }
    }
}
