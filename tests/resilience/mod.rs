//! Failure isolation: breakers deferring work, the timeout sweep, and the
//! background monitor lifecycle.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use content_orchestrator::config::CircuitBreakerComponentConfig;
use content_orchestrator::dispatch::{DispatchError, AUTOMATION_COMPONENT};
use content_orchestrator::models::AgentRole;
use content_orchestrator::orchestration::{SweepSummary, TaskTimeoutMonitor};
use content_orchestrator::resilience::CircuitState;
use content_orchestrator::state_machine::{RequestStatus, TaskStatus};

use crate::common::{new_request, test_config, with_all_workflows, TestHarness};

fn monitor(harness: &TestHarness) -> TaskTimeoutMonitor {
    TaskTimeoutMonitor::new(
        Arc::clone(&harness.orchestrator),
        harness.config.timeouts.clone(),
        Duration::from_secs(60),
    )
}

#[tokio::test]
async fn test_open_circuit_defers_without_spending_retries() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    harness
        .breakers
        .get_circuit_breaker(AUTOMATION_COMPONENT)
        .force_open();

    let submitted = harness.orchestrator.submit(new_request("text")).await.unwrap();
    let request_id = submitted.request_id;
    assert_eq!(submitted.status, RequestStatus::Draft);

    let executive = harness.task_for(request_id, AgentRole::Executive).await;
    assert_eq!(executive.status, TaskStatus::Pending);
    assert_eq!(executive.retry_count, 0);
    assert!(harness.automation.calls().is_empty());
    assert_eq!(harness.count_events(request_id, "dispatch_deferred").await, 1);
    assert_eq!(harness.count_events(request_id, "task_failed").await, 0);

    harness
        .breakers
        .get_circuit_breaker(AUTOMATION_COMPONENT)
        .force_closed();
    let summary = monitor(&harness).sweep().await.unwrap();
    assert_eq!(summary.reprocessed, 1);

    let executive = harness.task_for(request_id, AgentRole::Executive).await;
    assert_eq!(executive.status, TaskStatus::InProgress);
    assert_eq!(harness.automation.calls().len(), 1);
}

#[tokio::test]
async fn test_repeated_outages_open_the_breaker() {
    let mut config = with_all_workflows(test_config());
    config.circuit_breakers.component_configs.insert(
        AUTOMATION_COMPONENT.to_string(),
        CircuitBreakerComponentConfig {
            failure_threshold: 2,
            timeout_seconds: 60,
            success_threshold: 1,
            ..Default::default()
        },
    );
    let harness = TestHarness::with_automation(config);
    for _ in 0..2 {
        harness.automation.fail_next(DispatchError::Http {
            status: 503,
            body: "maintenance".to_string(),
        });
    }

    let submitted = harness.orchestrator.submit(new_request("text")).await.unwrap();
    assert_eq!(submitted.status, RequestStatus::Draft);

    let breaker = harness.breakers.get_circuit_breaker(AUTOMATION_COMPONENT);
    assert_eq!(breaker.state(), CircuitState::Open);

    let executive = harness.task_for(submitted.request_id, AgentRole::Executive).await;
    assert_eq!(executive.status, TaskStatus::Pending);
    assert_eq!(executive.retry_count, 2);
    assert_eq!(harness.automation.calls().len(), 2);
    assert_eq!(
        harness
            .count_events(submitted.request_id, "dispatch_deferred")
            .await,
        1
    );

    let metrics = harness.breakers.get_system_metrics();
    assert_eq!(metrics.open_circuits(), vec![AUTOMATION_COMPONENT]);
}

#[tokio::test]
async fn test_sweep_fails_overdue_tasks_into_retry() {
    let mut config = with_all_workflows(test_config());
    config.timeouts.executive_seconds = 0;
    let harness = TestHarness::with_automation(config);
    let request_id = harness
        .orchestrator
        .submit(new_request("text"))
        .await
        .unwrap()
        .request_id;

    tokio::time::sleep(Duration::from_millis(20)).await;
    let summary = monitor(&harness).sweep().await.unwrap();
    assert_eq!(
        summary,
        SweepSummary {
            timed_out: 1,
            reprocessed: 0,
            failed: 0
        }
    );

    let executive = harness.task_for(request_id, AgentRole::Executive).await;
    assert_eq!(executive.status, TaskStatus::InProgress);
    assert_eq!(executive.retry_count, 1);
    assert!(executive
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("TASK_TIMEOUT"));
    assert_eq!(harness.automation.calls_for(AgentRole::Executive).len(), 2);
}

#[tokio::test]
async fn test_sweep_leaves_tasks_within_their_timeout() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    harness.orchestrator.submit(new_request("text")).await.unwrap();

    let summary = monitor(&harness).sweep().await.unwrap();
    assert_eq!(summary, SweepSummary::default());
}

#[tokio::test]
async fn test_monitor_stops_on_shutdown() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = TaskTimeoutMonitor::new(
        Arc::clone(&harness.orchestrator),
        harness.config.timeouts.clone(),
        Duration::from_millis(10),
    )
    .spawn(shutdown_rx);

    tokio::time::sleep(Duration::from_millis(30)).await;
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor should stop")
        .unwrap();
}
