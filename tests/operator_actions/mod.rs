//! Operator actions: cancellation, rework from review, manual task retry.

use chrono::Utc;
use uuid::Uuid;

use content_orchestrator::models::AgentRole;
use content_orchestrator::state_machine::{RequestStatus, TaskStatus};
use content_orchestrator::store::{RequestStore, TaskUpdate};
use content_orchestrator::OrchestratorError;

use crate::common::{new_request, test_config, with_all_workflows, TestHarness};

async fn submit(harness: &TestHarness, request_type: &str) -> Uuid {
    harness
        .orchestrator
        .submit(new_request(request_type))
        .await
        .unwrap()
        .request_id
}

async fn complete_roles(harness: &TestHarness, request_id: Uuid, roles: &[AgentRole]) {
    for role in roles {
        let callback = harness.succeed(request_id, *role).await;
        let ack = harness.orchestrator.handle_callback(callback).await.unwrap();
        assert!(ack.applied, "{role} should complete");
    }
}

#[tokio::test]
async fn test_cancel_settles_every_unfinished_task() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = submit(&harness, "video_no_vo").await;
    complete_roles(&harness, request_id, &[AgentRole::Executive]).await;

    let request = harness
        .orchestrator
        .cancel_request(request_id, "brief withdrawn", "ops@example.com")
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Cancelled);

    let tasks = harness.tasks(request_id).await;
    let by_role = |role| tasks.iter().find(|t| t.agent_role == role).unwrap();
    assert_eq!(by_role(AgentRole::Executive).status, TaskStatus::Completed);
    let planner = by_role(AgentRole::TaskPlanner);
    assert_eq!(planner.status, TaskStatus::Cancelled);
    assert_eq!(
        planner.error_message.as_deref(),
        Some("CANCELLED: brief withdrawn")
    );
    for role in [AgentRole::Strategist, AgentRole::Producer, AgentRole::Qa] {
        assert_eq!(by_role(role).status, TaskStatus::Cancelled);
    }

    let events = harness.store.list_events(request_id).await.unwrap();
    let cancelled = events
        .iter()
        .find(|e| e.event_type == "request_cancelled")
        .unwrap();
    assert_eq!(cancelled.payload["cancelled_by"], "ops@example.com");
    assert_eq!(harness.orchestrator.dispatcher().tracker().outstanding(), 0);
}

#[tokio::test]
async fn test_cancelling_twice_is_a_conflict() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = submit(&harness, "text").await;

    harness
        .orchestrator
        .cancel_request(request_id, "first", "ops")
        .await
        .unwrap();
    let err = harness
        .orchestrator
        .cancel_request(request_id, "second", "ops")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::RequestTerminal {
            status: RequestStatus::Cancelled,
            ..
        }
    ));
    assert_eq!(harness.count_events(request_id, "request_cancelled").await, 1);
}

#[tokio::test]
async fn test_cancel_unknown_request() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let err = harness
        .orchestrator
        .cancel_request(Uuid::new_v4(), "nothing", "ops")
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::RequestNotFound(_)));
}

#[tokio::test]
async fn test_rework_resets_from_role_and_returns_to_draft() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = submit(&harness, "text").await;
    complete_roles(&harness, request_id, &[AgentRole::Executive, AgentRole::Copywriter]).await;
    let stale_review = harness.succeed(request_id, AgentRole::Qa).await;

    let request = harness
        .orchestrator
        .request_rework(request_id, AgentRole::Copywriter, "tone is off-brand")
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Draft);

    let executive = harness.task_for(request_id, AgentRole::Executive).await;
    assert_eq!(executive.status, TaskStatus::Completed);
    let copywriter = harness.task_for(request_id, AgentRole::Copywriter).await;
    assert_eq!(copywriter.status, TaskStatus::InProgress);
    assert_eq!(copywriter.retry_count, 0);
    assert!(copywriter.output_data.is_none());
    let qa = harness.task_for(request_id, AgentRole::Qa).await;
    assert_eq!(qa.status, TaskStatus::Pending);

    let ack = harness.orchestrator.handle_callback(stale_review).await.unwrap();
    assert!(!ack.applied);

    assert_eq!(harness.automation.calls_for(AgentRole::Copywriter).len(), 2);
    complete_roles(&harness, request_id, &[AgentRole::Copywriter, AgentRole::Qa]).await;
    let view = harness.orchestrator.get_request(request_id).await.unwrap();
    assert_eq!(view.request.status, RequestStatus::Published);
}

#[tokio::test]
async fn test_rework_requires_review_status() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = submit(&harness, "text").await;

    let err = harness
        .orchestrator
        .request_rework(request_id, AgentRole::Copywriter, "too early")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::IllegalTransition {
            from: RequestStatus::Draft,
            to: RequestStatus::Draft,
            ..
        }
    ));
}

#[tokio::test]
async fn test_rework_from_role_outside_graph() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = submit(&harness, "text").await;
    complete_roles(&harness, request_id, &[AgentRole::Executive, AgentRole::Copywriter]).await;

    let err = harness
        .orchestrator
        .request_rework(request_id, AgentRole::Producer, "no producer here")
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Validation(_)));

    let view = harness.orchestrator.get_request(request_id).await.unwrap();
    assert_eq!(view.request.status, RequestStatus::Qa);
}

#[tokio::test]
async fn test_manual_retry_redispatches_failed_task() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = submit(&harness, "text").await;
    let executive = harness.task_for(request_id, AgentRole::Executive).await;

    // A failed task on a live request, e.g. left behind by a crashed process
    let failed = harness
        .store
        .cas_task(
            executive.id,
            TaskStatus::InProgress,
            TaskUpdate::fail("DISPATCH_FAILED: upstream reset", Utc::now()),
        )
        .await
        .unwrap();
    assert!(failed.is_success());

    let task = harness.orchestrator.retry_task(executive.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.retry_count, 1);
    assert_eq!(harness.automation.calls_for(AgentRole::Executive).len(), 2);
    assert_eq!(harness.count_events(request_id, "task_retry_scheduled").await, 1);
}

#[tokio::test]
async fn test_manual_retry_rejects_unfailed_task() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = submit(&harness, "text").await;
    let executive = harness.task_for(request_id, AgentRole::Executive).await;

    let err = harness.orchestrator.retry_task(executive.id).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::TaskNotReady { .. }));
}

#[tokio::test]
async fn test_manual_retry_respects_budget() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = submit(&harness, "text").await;
    let executive = harness.task_for(request_id, AgentRole::Executive).await;

    let exhausted = TaskUpdate {
        retry_count: Some(harness.config.orchestration.max_task_retries as i32),
        ..TaskUpdate::fail("DISPATCH_FAILED: again", Utc::now())
    };
    harness
        .store
        .cas_task(executive.id, TaskStatus::InProgress, exhausted)
        .await
        .unwrap();

    let err = harness.orchestrator.retry_task(executive.id).await.unwrap_err();
    match err {
        OrchestratorError::TaskNotReady { reason, .. } => {
            assert!(reason.contains("retry budget exhausted"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_manual_retry_on_cancelled_request() {
    let mut config = with_all_workflows(test_config());
    config.orchestration.max_task_retries = 0;
    let harness = TestHarness::with_automation(config);
    let request_id = submit(&harness, "text").await;

    let callback = harness.fail(request_id, AgentRole::Executive, "boom").await;
    harness.orchestrator.handle_callback(callback).await.unwrap();
    let executive = harness.task_for(request_id, AgentRole::Executive).await;
    assert_eq!(executive.status, TaskStatus::Failed);

    let err = harness.orchestrator.retry_task(executive.id).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::RequestTerminal { .. }));
}
