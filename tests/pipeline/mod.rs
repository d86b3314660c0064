//! End-to-end runs of the request pipeline through the public orchestrator
//! API, with the automation system and capabilities faked.

use serde_json::json;

use content_orchestrator::dispatch::DispatchError;
use content_orchestrator::models::AgentRole;
use content_orchestrator::orchestration::ResumeResult;
use content_orchestrator::registry::AgentExecutionResult;
use content_orchestrator::state_machine::{RequestStatus, TaskStatus};

use crate::common::{
    new_request, test_config, with_all_workflows, FakeCapability, TestHarness,
};

#[tokio::test]
async fn test_video_submission_dispatches_only_the_executive() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));

    let submitted = harness
        .orchestrator
        .submit(new_request("video_with_vo"))
        .await
        .unwrap();

    assert_eq!(submitted.status, RequestStatus::Draft);
    assert_eq!(submitted.task_count, 6);

    let calls = harness.automation.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].agent_role, AgentRole::Executive);
    assert_eq!(calls[0].workflow_id, "wf-strategy");
    assert!(calls[0]
        .payload
        .callback_url
        .contains(&submitted.request_id.to_string()));

    let tasks = harness.tasks(submitted.request_id).await;
    let in_progress: Vec<_> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .collect();
    assert_eq!(in_progress.len(), 1);
    assert_eq!(in_progress[0].agent_role, AgentRole::Executive);
    assert_eq!(
        tasks.iter().filter(|t| t.status == TaskStatus::Pending).count(),
        5
    );

    let events = harness.event_types(submitted.request_id).await;
    assert_eq!(events[0], "request_created");
    assert!(events.contains(&"status_changed".to_string()));
    assert!(events.contains(&"task_started".to_string()));
}

#[tokio::test]
async fn test_video_runs_to_published_through_callbacks() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = harness
        .orchestrator
        .submit(new_request("video_with_vo"))
        .await
        .unwrap()
        .request_id;

    let expectations = [
        (AgentRole::Executive, RequestStatus::Draft),
        (AgentRole::TaskPlanner, RequestStatus::Draft),
        (AgentRole::Strategist, RequestStatus::Draft),
        (AgentRole::Copywriter, RequestStatus::Production),
        (AgentRole::Producer, RequestStatus::Qa),
        (AgentRole::Qa, RequestStatus::Published),
    ];
    for (role, expected_status) in expectations {
        let callback = harness.succeed(request_id, role).await;
        let ack = harness.orchestrator.handle_callback(callback).await.unwrap();
        assert!(ack.applied, "{role} callback should apply");

        let view = harness.orchestrator.get_request(request_id).await.unwrap();
        assert_eq!(view.request.status, expected_status, "after {role}");
    }

    let tasks = harness.tasks(request_id).await;
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));

    let producer = harness.task_for(request_id, AgentRole::Producer).await;
    assert_eq!(
        producer.output_url.as_deref(),
        Some("https://cdn.example.com/asset.png")
    );

    let video_call = &harness.automation.calls_for(AgentRole::Producer)[0];
    assert_eq!(video_call.workflow_id, "wf-video");
    assert_eq!(video_call.payload.script_id.as_deref(), Some("script-1"));
    assert!(video_call.payload.input.contains_key("copywriter"));

    assert_eq!(harness.automation.calls().len(), 6);
    assert_eq!(harness.orchestrator.dispatcher().tracker().outstanding(), 0);
}

#[tokio::test]
async fn test_image_completes_inline_with_direct_capabilities() {
    let producer = FakeCapability::new(AgentRole::Producer);
    let harness = TestHarness::with_capabilities(
        test_config(),
        &[
            FakeCapability::new(AgentRole::Executive),
            FakeCapability::new(AgentRole::Strategist),
            producer.clone(),
            FakeCapability::new(AgentRole::Qa),
        ],
    );

    let submitted = harness.orchestrator.submit(new_request("image")).await.unwrap();
    assert_eq!(submitted.status, RequestStatus::Published);
    assert_eq!(submitted.task_count, 4);

    assert_eq!(producer.call_count(), 1);
    let params = &producer.calls()[0];
    assert!(params.width.is_some() && params.height.is_some());
    assert!(params.prompt.contains("Spring collection launch"));

    let task = harness.task_for(submitted.request_id, AgentRole::Producer).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(
        task.output_url.as_deref(),
        Some("https://cdn.example.com/asset.png")
    );
    assert!(task.output_data.unwrap().get("generation").is_some());
    assert!(harness.automation.calls().is_empty());
}

#[tokio::test]
async fn test_flaky_producer_recovers_within_retry_budget() {
    let producer = FakeCapability::new(AgentRole::Producer)
        .then(AgentExecutionResult::failed("model overloaded"))
        .then(AgentExecutionResult::failed("model overloaded"));
    let harness = TestHarness::with_capabilities(
        test_config(),
        &[
            FakeCapability::new(AgentRole::Executive),
            FakeCapability::new(AgentRole::Strategist),
            producer.clone(),
            FakeCapability::new(AgentRole::Qa),
        ],
    );

    let submitted = harness.orchestrator.submit(new_request("image")).await.unwrap();
    let request_id = submitted.request_id;

    assert_eq!(submitted.status, RequestStatus::Published);
    assert_eq!(producer.call_count(), 3);
    let task = harness.task_for(request_id, AgentRole::Producer).await;
    assert_eq!(task.retry_count, 2);
    assert_eq!(task.status, TaskStatus::Completed);

    assert_eq!(harness.count_events(request_id, "task_failed").await, 2);
    assert_eq!(harness.count_events(request_id, "task_retry_scheduled").await, 2);
    assert_eq!(harness.count_events(request_id, "request_cancelled").await, 0);
}

#[tokio::test]
async fn test_producer_success_without_asset_is_regenerated() {
    let producer = FakeCapability::new(AgentRole::Producer)
        .then(AgentExecutionResult::succeeded(json!({}), None));
    let mut config = test_config();
    config.dispatch.direct_generation_attempts = 3;
    let harness = TestHarness::with_capabilities(
        config,
        &[
            FakeCapability::new(AgentRole::Executive),
            FakeCapability::new(AgentRole::Strategist),
            producer.clone(),
            FakeCapability::new(AgentRole::Qa),
        ],
    );

    let submitted = harness.orchestrator.submit(new_request("image")).await.unwrap();
    assert_eq!(submitted.status, RequestStatus::Published);
    assert_eq!(producer.call_count(), 2);

    let task = harness.task_for(submitted.request_id, AgentRole::Producer).await;
    assert_eq!(task.retry_count, 0);
    assert_eq!(
        task.output_url.as_deref(),
        Some("https://cdn.example.com/asset.png")
    );
    assert_eq!(task.output_data.unwrap()["generation"]["attempts"], 2);
}

#[tokio::test]
async fn test_producer_error_callbacks_keep_request_in_production() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = harness
        .orchestrator
        .submit(new_request("image"))
        .await
        .unwrap()
        .request_id;

    for role in [AgentRole::Executive, AgentRole::Strategist] {
        let callback = harness.succeed(request_id, role).await;
        harness.orchestrator.handle_callback(callback).await.unwrap();
    }

    for attempt in 1..=2 {
        let callback = harness
            .fail(request_id, AgentRole::Producer, "render farm unavailable")
            .await;
        let ack = harness.orchestrator.handle_callback(callback).await.unwrap();
        assert!(ack.applied);
        assert!(ack.message.contains(&format!("retry {attempt}")));

        let view = harness.orchestrator.get_request(request_id).await.unwrap();
        assert_eq!(view.request.status, RequestStatus::Production);

        let task = harness.task_for(request_id, AgentRole::Producer).await;
        assert_eq!(task.status, TaskStatus::InProgress, "re-dispatched");
        assert_eq!(task.retry_count, attempt);
        assert!(task
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("AUTOMATION_WORKFLOW_ERROR"));
    }

    let producer_calls = harness.automation.calls_for(AgentRole::Producer);
    assert_eq!(producer_calls.len(), 3);
    assert_ne!(
        producer_calls[0].idempotency_key,
        producer_calls[1].idempotency_key
    );

    let callback = harness.succeed(request_id, AgentRole::Producer).await;
    harness.orchestrator.handle_callback(callback).await.unwrap();
    let view = harness.orchestrator.get_request(request_id).await.unwrap();
    assert_eq!(view.request.status, RequestStatus::Qa);
    assert_eq!(harness.automation.calls_for(AgentRole::Qa).len(), 1);
}

#[tokio::test]
async fn test_qa_failure_cancels_immediately() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = harness
        .orchestrator
        .submit(new_request("text"))
        .await
        .unwrap()
        .request_id;

    for role in [AgentRole::Executive, AgentRole::Copywriter] {
        let callback = harness.succeed(request_id, role).await;
        harness.orchestrator.handle_callback(callback).await.unwrap();
    }

    let callback = harness
        .fail(request_id, AgentRole::Qa, "brand guidelines violated")
        .await;
    let ack = harness.orchestrator.handle_callback(callback).await.unwrap();
    assert!(ack.applied);
    assert_eq!(ack.message, "task failed; request cancelled");

    let view = harness.orchestrator.get_request(request_id).await.unwrap();
    assert_eq!(view.request.status, RequestStatus::Cancelled);
    let qa = harness.task_for(request_id, AgentRole::Qa).await;
    assert_eq!(qa.status, TaskStatus::Failed);
    assert_eq!(qa.retry_count, 0);

    assert_eq!(harness.count_events(request_id, "task_retry_scheduled").await, 0);
    assert_eq!(harness.count_events(request_id, "task_dead_lettered").await, 0);
    assert_eq!(harness.count_events(request_id, "request_cancelled").await, 1);
}

#[tokio::test]
async fn test_exhausted_retries_dead_letter_and_cancel() {
    let mut config = with_all_workflows(test_config());
    config.orchestration.max_task_retries = 1;
    let harness = TestHarness::with_automation(config);
    let request_id = harness
        .orchestrator
        .submit(new_request("text"))
        .await
        .unwrap()
        .request_id;

    let first = harness.fail(request_id, AgentRole::Executive, "timeout").await;
    let result = harness.orchestrator.handle_callback(first).await.unwrap();
    assert!(result.message.contains("retry 1"));

    let second = harness.fail(request_id, AgentRole::Executive, "timeout").await;
    let result = harness.orchestrator.handle_callback(second).await.unwrap();
    assert_eq!(result.message, "task failed; request cancelled");

    let tasks = harness.tasks(request_id).await;
    let executive = tasks.iter().find(|t| t.agent_role == AgentRole::Executive).unwrap();
    assert_eq!(executive.status, TaskStatus::Failed);
    assert!(tasks
        .iter()
        .filter(|t| t.agent_role != AgentRole::Executive)
        .all(|t| t.status == TaskStatus::Cancelled));
    assert_eq!(harness.count_events(request_id, "task_dead_lettered").await, 1);
}

#[tokio::test]
async fn test_rejected_dispatch_cancels_without_retry() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    harness.automation.fail_next(DispatchError::Http {
        status: 422,
        body: "missing brief".to_string(),
    });

    let submitted = harness.orchestrator.submit(new_request("text")).await.unwrap();
    assert_eq!(submitted.status, RequestStatus::Cancelled);

    let executive = harness.task_for(submitted.request_id, AgentRole::Executive).await;
    assert_eq!(executive.status, TaskStatus::Failed);
    assert_eq!(executive.retry_count, 0);
    assert!(executive
        .error_message
        .unwrap()
        .starts_with("DISPATCH_FAILED"));
}

#[tokio::test]
async fn test_task_without_any_worker_cancels_request() {
    let harness = TestHarness::with_automation(test_config());

    let submitted = harness.orchestrator.submit(new_request("text")).await.unwrap();
    assert_eq!(submitted.status, RequestStatus::Cancelled);

    let executive = harness.task_for(submitted.request_id, AgentRole::Executive).await;
    assert!(executive
        .error_message
        .unwrap()
        .starts_with("WORKFLOW_NOT_FOUND"));
    assert!(harness.automation.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_request_type_is_rejected_before_persisting() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));

    let err = harness
        .orchestrator
        .submit(new_request("podcast"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        content_orchestrator::OrchestratorError::UnknownRequestType(_)
    ));
    assert_eq!(harness.store.request_count(), 0);
}

#[tokio::test]
async fn test_progress_tracks_in_flight_work() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = harness
        .orchestrator
        .submit(new_request("text"))
        .await
        .unwrap()
        .request_id;

    let progress = harness.orchestrator.progress(request_id).await.unwrap();
    assert_eq!(progress.status, RequestStatus::Draft);
    assert_eq!(progress.current_step, 1);
    assert_eq!(progress.total_steps, 3);
    assert_eq!(progress.completion_percentage, 0);
    assert!(progress.milestones.intake_complete);
    assert!(!progress.milestones.draft_complete);
    assert_eq!(progress.task_counts.in_progress, 1);

    let callback = harness.succeed(request_id, AgentRole::Executive).await;
    harness.orchestrator.handle_callback(callback).await.unwrap();

    let progress = harness.orchestrator.progress(request_id).await.unwrap();
    assert_eq!(progress.current_step, 2);
    assert_eq!(progress.current_phase, "Copy Writing");
    assert_eq!(progress.task_counts.completed, 1);
    assert!(progress.estimated_seconds_remaining < 40);
}

#[tokio::test]
async fn test_processing_pass_on_settled_request_is_noop() {
    let harness = TestHarness::with_automation(with_all_workflows(test_config()));
    let request_id = harness
        .orchestrator
        .submit(new_request("text"))
        .await
        .unwrap()
        .request_id;

    let summary = harness.orchestrator.process_request(request_id).await.unwrap();
    assert_eq!(summary.dispatched, 0);
    assert_eq!(summary.final_status, RequestStatus::Draft);
    assert_eq!(harness.automation.calls().len(), 1);

    let result = harness
        .orchestrator
        .resume(
            harness.task_for(request_id, AgentRole::Copywriter).await.id,
            content_orchestrator::orchestration::TaskOutcome::Completed {
                output: serde_json::json!({"script": "early"}),
                output_url: None,
            },
        )
        .await
        .unwrap();
    assert!(matches!(result, ResumeResult::Ignored { .. }));
}
