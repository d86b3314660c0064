//! Shared fixtures for the integration suite: scripted fakes for the
//! automation system and agent capabilities, and a harness that wires them
//! into an orchestrator backed by the in-memory store.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use content_orchestrator::config::OrchestratorConfig;
use content_orchestrator::dispatch::{
    AutomationClient, DispatchAdapter, DispatchError, DispatchPayload, WorkflowExecution,
};
use content_orchestrator::events::{EventLog, EventPublisher};
use content_orchestrator::models::{AgentRole, NewContentRequest, RequestTask};
use content_orchestrator::orchestration::{CallbackPayload, CallbackStatus, RequestOrchestrator};
use content_orchestrator::registry::{
    AgentCapability, AgentExecutionResult, CapabilityParams, CapabilityRegistry,
};
use content_orchestrator::resilience::CircuitBreakerManager;
use content_orchestrator::store::{InMemoryRequestStore, RequestStore};

/// One call received by [`FakeAutomationClient`]
#[derive(Debug, Clone)]
pub struct RecordedDispatch {
    pub workflow_id: String,
    pub task_id: Uuid,
    pub agent_role: AgentRole,
    pub idempotency_key: String,
    pub payload: DispatchPayload,
}

/// Automation system double. Accepts every workflow with a fresh execution
/// id unless a failure is queued.
#[derive(Debug, Default)]
pub struct FakeAutomationClient {
    calls: Mutex<Vec<RecordedDispatch>>,
    failures: Mutex<VecDeque<DispatchError>>,
    counter: AtomicUsize,
    healthy: Mutex<bool>,
}

impl FakeAutomationClient {
    pub fn new() -> Self {
        Self {
            healthy: Mutex::new(true),
            ..Default::default()
        }
    }

    /// Fail the next call with `err`
    pub fn fail_next(&self, err: DispatchError) {
        self.failures.lock().push_back(err);
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock() = healthy;
    }

    pub fn calls(&self) -> Vec<RecordedDispatch> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, role: AgentRole) -> Vec<RecordedDispatch> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.agent_role == role)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AutomationClient for FakeAutomationClient {
    async fn execute_workflow(
        &self,
        workflow_id: &str,
        payload: &DispatchPayload,
        idempotency_key: &str,
        _timeout: Duration,
    ) -> Result<WorkflowExecution, DispatchError> {
        self.calls.lock().push(RecordedDispatch {
            workflow_id: workflow_id.to_string(),
            task_id: payload.task_id,
            agent_role: payload.agent_role,
            idempotency_key: idempotency_key.to_string(),
            payload: payload.clone(),
        });
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(WorkflowExecution {
            execution_id: format!("exec-{n}"),
            workflow_id: workflow_id.to_string(),
            status: "running".to_string(),
        })
    }

    async fn health_check(&self) -> bool {
        *self.healthy.lock()
    }
}

/// Output that passes stage validation for `role`
pub fn output_for(role: AgentRole) -> Value {
    match role {
        AgentRole::Executive => json!({"brief": "Spring launch", "validated": true}),
        AgentRole::TaskPlanner => json!({"plan": ["strategy", "script", "video", "review"]}),
        AgentRole::Strategist => json!({"strategic_brief": {"angle": "bold"}}),
        AgentRole::Copywriter => json!({"script_id": "script-1", "script": "Hello spring"}),
        AgentRole::Producer => json!({"output_url": "https://cdn.example.com/asset.png"}),
        AgentRole::Qa => json!({"approved": true, "notes": "ship it"}),
    }
}

/// Capability double. Plays back queued results, then succeeds with
/// [`output_for`] its role.
pub struct FakeCapability {
    role: AgentRole,
    script: Mutex<VecDeque<AgentExecutionResult>>,
    calls: Mutex<Vec<CapabilityParams>>,
}

impl FakeCapability {
    pub fn new(role: AgentRole) -> Arc<Self> {
        Arc::new(Self {
            role,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn then(self: &Arc<Self>, result: AgentExecutionResult) -> Arc<Self> {
        self.script.lock().push_back(result);
        Arc::clone(self)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<CapabilityParams> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AgentCapability for FakeCapability {
    fn name(&self) -> &str {
        "fake"
    }

    async fn execute(&self, params: &CapabilityParams) -> AgentExecutionResult {
        self.calls.lock().push(params.clone());
        if let Some(result) = self.script.lock().pop_front() {
            return result;
        }
        let output = output_for(self.role);
        let url = output
            .get("output_url")
            .and_then(Value::as_str)
            .map(str::to_string);
        AgentExecutionResult::succeeded(output, url)
    }
}

/// Configuration tuned for tests: one network attempt, one direct attempt,
/// no waiting between attempts.
pub fn test_config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.retry.max_attempts = 1;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 1;
    config.dispatch.direct_generation_attempts = 1;
    config.dispatch.direct_generation_retry_delay_ms = 0;
    config
}

/// Route every workflow category to the automation system
pub fn with_all_workflows(mut config: OrchestratorConfig) -> OrchestratorConfig {
    let workflows = &mut config.dispatch.workflows;
    workflows.strategy = Some("wf-strategy".to_string());
    workflows.copywriting = Some("wf-copy".to_string());
    workflows.video_production = Some("wf-video".to_string());
    workflows.voiceover_synthesis = Some("wf-voiceover".to_string());
    workflows.image_generation = Some("wf-image".to_string());
    workflows.review = Some("wf-review".to_string());
    config
}

pub struct TestHarness {
    pub orchestrator: Arc<RequestOrchestrator>,
    pub store: Arc<InMemoryRequestStore>,
    pub automation: Arc<FakeAutomationClient>,
    pub capabilities: Arc<CapabilityRegistry>,
    pub breakers: Arc<CircuitBreakerManager>,
    pub config: OrchestratorConfig,
}

impl TestHarness {
    /// Orchestrator with the fake automation client attached
    pub fn with_automation(config: OrchestratorConfig) -> Self {
        Self::build(config, true, &[])
    }

    /// Orchestrator with direct capabilities for `roles` and no automation
    pub fn with_capabilities(config: OrchestratorConfig, roles: &[Arc<FakeCapability>]) -> Self {
        Self::build(config, false, roles)
    }

    pub fn build(
        config: OrchestratorConfig,
        automation: bool,
        capabilities: &[Arc<FakeCapability>],
    ) -> Self {
        let store = Arc::new(InMemoryRequestStore::new());
        let fake = Arc::new(FakeAutomationClient::new());
        let registry = Arc::new(CapabilityRegistry::new());
        for capability in capabilities {
            registry.register(capability.role, Arc::clone(capability) as Arc<dyn AgentCapability>);
        }
        let breakers = Arc::new(CircuitBreakerManager::from_settings(&config.circuit_breakers));
        let client = automation.then(|| Arc::clone(&fake) as Arc<dyn AutomationClient>);
        let dispatcher = Arc::new(DispatchAdapter::new(
            &config,
            client,
            Arc::clone(&registry),
            Arc::clone(&breakers),
        ));
        let events = EventLog::new(
            Arc::clone(&store) as Arc<dyn RequestStore>,
            EventPublisher::default(),
        );
        let orchestrator = Arc::new(RequestOrchestrator::new(
            Arc::clone(&store) as Arc<dyn RequestStore>,
            dispatcher,
            events,
            config.orchestration.clone(),
        ));

        Self {
            orchestrator,
            store,
            automation: fake,
            capabilities: registry,
            breakers,
            config,
        }
    }

    pub async fn tasks(&self, request_id: Uuid) -> Vec<RequestTask> {
        self.store.list_tasks(request_id).await.expect("list tasks")
    }

    pub async fn task_for(&self, request_id: Uuid, role: AgentRole) -> RequestTask {
        self.tasks(request_id)
            .await
            .into_iter()
            .find(|t| t.agent_role == role)
            .expect("task for role")
    }

    /// Event types of a request in insertion order
    pub async fn event_types(&self, request_id: Uuid) -> Vec<String> {
        self.store
            .list_events(request_id)
            .await
            .expect("list events")
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    pub async fn count_events(&self, request_id: Uuid, event_type: &str) -> usize {
        self.event_types(request_id)
            .await
            .iter()
            .filter(|t| t.as_str() == event_type)
            .count()
    }

    /// Execution id currently recorded for a task
    pub fn execution_id(&self, task_id: Uuid) -> String {
        self.orchestrator
            .dispatcher()
            .tracker()
            .get(task_id)
            .expect("tracked dispatch")
            .execution_id
    }

    /// Successful callback for the current execution of `role`'s task
    pub async fn succeed(&self, request_id: Uuid, role: AgentRole) -> CallbackPayload {
        let task = self.task_for(request_id, role).await;
        success_callback(request_id, task.id, &self.execution_id(task.id), output_for(role))
    }

    /// Error callback for the current execution of `role`'s task
    pub async fn fail(&self, request_id: Uuid, role: AgentRole, message: &str) -> CallbackPayload {
        let task = self.task_for(request_id, role).await;
        error_callback(request_id, task.id, &self.execution_id(task.id), message)
    }
}

pub fn new_request(request_type: &str) -> NewContentRequest {
    NewContentRequest {
        brand_id: Uuid::new_v4(),
        campaign_id: None,
        request_type: request_type.to_string(),
        requirements: json!({"brief": "Spring collection launch"}),
        settings: json!({"aspect_ratio": "16:9"}),
    }
}

pub fn success_callback(
    request_id: Uuid,
    task_id: Uuid,
    execution_id: &str,
    result: Value,
) -> CallbackPayload {
    CallbackPayload {
        request_id,
        task_id,
        execution_id: execution_id.to_string(),
        workflow_id: None,
        status: CallbackStatus::Success,
        result: Some(result),
        error: None,
    }
}

pub fn error_callback(
    request_id: Uuid,
    task_id: Uuid,
    execution_id: &str,
    message: &str,
) -> CallbackPayload {
    serde_json::from_value(json!({
        "requestId": request_id,
        "taskId": task_id,
        "executionId": execution_id,
        "status": "error",
        "error": message,
    }))
    .expect("valid callback")
}
