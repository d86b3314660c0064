//! HTTP clients against a mock automation system and capability endpoint.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use content_orchestrator::config::CapabilityEndpoint;
use content_orchestrator::dispatch::{
    AutomationClient, DispatchAdapter, DispatchError, DispatchPayload, HttpAutomationClient,
};
use content_orchestrator::events::{EventLog, EventPublisher};
use content_orchestrator::models::{AgentRole, RequestType};
use content_orchestrator::orchestration::{RequestOrchestrator, TaskGraphFactory};
use content_orchestrator::registry::{
    AgentCapability, CapabilityParams, CapabilityRegistry, HttpAgentCapability,
};
use content_orchestrator::resilience::{CircuitBreakerManager, Retryable};
use content_orchestrator::state_machine::RequestStatus;
use content_orchestrator::store::{InMemoryRequestStore, RequestStore};

use crate::common::{new_request, test_config, with_all_workflows};

fn executive_payload() -> DispatchPayload {
    let request = new_request("text").into_request().unwrap();
    let tasks = TaskGraphFactory::build_tasks(&request);
    DispatchPayload::build(&request, &tasks[0], &tasks, "https://orchestrator.test", "standard")
        .unwrap()
}

#[tokio::test]
async fn test_execute_workflow_sends_key_headers_and_parses_execution() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/wf-strategy/execute"))
        .and(header("X-N8N-API-KEY", "secret"))
        .and(header("X-Idempotency-Key", "idempotency:abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"executionId": "ex-77", "status": "running"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpAutomationClient::new(
        format!("{}/", server.uri()),
        Some("secret".to_string()),
        reqwest::Client::new(),
    );
    let execution = client
        .execute_workflow(
            "wf-strategy",
            &executive_payload(),
            "idempotency:abc",
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert_eq!(execution.execution_id, "ex-77");
    assert_eq!(execution.workflow_id, "wf-strategy");
    assert_eq!(execution.status, "running");
}

#[tokio::test]
async fn test_server_errors_are_retryable_client_errors_are_not() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/wf-down/execute"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/wf-strict/execute"))
        .respond_with(ResponseTemplate::new(422).set_body_string("missing script_id"))
        .mount(&server)
        .await;

    let client = HttpAutomationClient::new(server.uri(), None, reqwest::Client::new());
    let payload = executive_payload();

    let down = client
        .execute_workflow("wf-down", &payload, "k1", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(down, DispatchError::Http { status: 503, .. }));
    assert!(down.is_retryable());

    let strict = client
        .execute_workflow("wf-strict", &payload, "k2", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(strict, DispatchError::Http { status: 422, ref body } if body == "missing script_id"));
    assert!(!strict.is_retryable());
}

#[tokio::test]
async fn test_slow_automation_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HttpAutomationClient::new(server.uri(), None, reqwest::Client::new());
    let err = client
        .execute_workflow("wf-slow", &executive_payload(), "k", Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Timeout(_)));
}

#[tokio::test]
async fn test_health_check_reflects_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let healthy = HttpAutomationClient::new(server.uri(), None, reqwest::Client::new());
    assert!(healthy.health_check().await);

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing)
        .await;
    let unhealthy = HttpAutomationClient::new(failing.uri(), None, reqwest::Client::new());
    assert!(!unhealthy.health_check().await);
}

#[tokio::test]
async fn test_submission_posts_callback_url_to_automation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/wf-strategy/execute"))
        .and(header_exists("X-Idempotency-Key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"executionId": "ex-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = with_all_workflows(test_config());
    let store: Arc<dyn RequestStore> = Arc::new(InMemoryRequestStore::new());
    let client: Arc<dyn AutomationClient> = Arc::new(HttpAutomationClient::new(
        server.uri(),
        None,
        reqwest::Client::new(),
    ));
    let dispatcher = Arc::new(DispatchAdapter::new(
        &config,
        Some(client),
        Arc::new(CapabilityRegistry::new()),
        Arc::new(CircuitBreakerManager::from_settings(&config.circuit_breakers)),
    ));
    let orchestrator = RequestOrchestrator::new(
        Arc::clone(&store),
        dispatcher,
        EventLog::new(Arc::clone(&store), EventPublisher::default()),
        config.orchestration.clone(),
    );

    let submitted = orchestrator.submit(new_request("text")).await.unwrap();
    assert_eq!(submitted.status, RequestStatus::Draft);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["agentRole"], "executive");
    assert_eq!(body["contentType"], "text");
    assert_eq!(body["budget_tier"], "standard");
    let callback_url = body["callbackUrl"].as_str().unwrap();
    assert!(callback_url.starts_with("http://localhost:8080/v1/callbacks/automation?"));
    assert!(callback_url.contains(&submitted.request_id.to_string()));
}

fn capability_params() -> CapabilityParams {
    CapabilityParams {
        request_id: uuid::Uuid::new_v4(),
        task_id: uuid::Uuid::new_v4(),
        task_name: "Image Generation".to_string(),
        agent_role: AgentRole::Producer,
        request_type: RequestType::Image,
        prompt: "Spring collection".to_string(),
        seed: 42,
        width: Some(1024),
        height: Some(1024),
        payload: json!({}),
    }
}

#[tokio::test]
async fn test_http_capability_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "output": {"frames": 1},
            "output_url": "https://cdn.example.com/gen.png"
        })))
        .mount(&server)
        .await;

    let endpoint = CapabilityEndpoint {
        url: format!("{}/generate", server.uri()),
        timeout_ms: 2_000,
    };
    let capability = HttpAgentCapability::new("http:producer", &endpoint, reqwest::Client::new());
    let result = capability.execute(&capability_params()).await;

    assert!(result.success);
    assert_eq!(result.output_url.as_deref(), Some("https://cdn.example.com/gen.png"));
    assert_eq!(capability.timeout_override(), Some(Duration::from_secs(2)));

    let received = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(sent["seed"], 42);
    assert_eq!(sent["agent_role"], "producer");
}

#[tokio::test]
async fn test_http_capability_reports_failures_in_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("GPU out of memory"))
        .mount(&server)
        .await;

    let endpoint = CapabilityEndpoint {
        url: server.uri(),
        timeout_ms: 2_000,
    };
    let capability = HttpAgentCapability::new("http:producer", &endpoint, reqwest::Client::new());
    let result = capability.execute(&capability_params()).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("HTTP 500"));
    assert!(error.contains("GPU out of memory"));
}
