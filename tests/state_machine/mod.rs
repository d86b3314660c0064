//! Property tests over the lifecycle rules, the task graphs and ready-set
//! discovery.

use chrono::Utc;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

use content_orchestrator::models::{completed_roles, AgentRole, NewContentRequest, RequestType};
use content_orchestrator::orchestration::{ReadyTaskDiscovery, TaskGraphFactory};
use content_orchestrator::state_machine::{
    allowed_transitions, can_transition, can_transition_task, forward_path, validate_transition,
    RequestStatus, TaskStatus,
};

fn request_status() -> impl Strategy<Value = RequestStatus> {
    prop::sample::select(RequestStatus::ALL.to_vec())
}

fn request_type() -> impl Strategy<Value = RequestType> {
    prop::sample::select(RequestType::ALL.to_vec())
}

fn task_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(vec![
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ])
}

proptest! {
    /// Property: validation agrees with the edge table
    #[test]
    fn validation_matches_edge_table(from in request_status(), to in request_status()) {
        let validation = validate_transition(from, to);
        prop_assert_eq!(validation.valid, can_transition(from, to));
        prop_assert_eq!(validation.clone().into_result().is_ok(), validation.valid);
        if !validation.valid {
            prop_assert!(validation.error.is_some());
        }
    }

    /// Property: a suggestion is always itself a legal step
    #[test]
    fn suggestions_are_legal(from in request_status(), to in request_status()) {
        if let Some(suggested) = validate_transition(from, to).suggested {
            prop_assert!(can_transition(from, suggested));
        }
    }

    /// Property: forward paths are chains of legal steps ending at the target
    #[test]
    fn forward_paths_are_walkable(from in request_status(), to in request_status()) {
        let path = forward_path(from, to);
        match (from.ordinal(), to.ordinal()) {
            (Some(f), Some(t)) if t > f => {
                prop_assert_eq!(path.last().copied(), Some(to));
                prop_assert_eq!(path.len(), usize::from(t - f));
                let mut current = from;
                for step in path {
                    prop_assert!(can_transition(current, step));
                    current = step;
                }
            }
            _ => prop_assert!(path.is_empty()),
        }
    }

    /// Property: random walks never leave a terminal status and only move
    /// backwards through rework
    #[test]
    fn random_walks_respect_lifecycle(choices in prop::collection::vec(0usize..8, 0..40)) {
        let mut status = RequestStatus::Intake;
        for choice in choices {
            let options = allowed_transitions(status);
            if options.is_empty() {
                prop_assert!(status.is_terminal());
                break;
            }
            let next = options[choice % options.len()];
            if let (Some(f), Some(t)) = (status.ordinal(), next.ordinal()) {
                prop_assert!(t > f || (status == RequestStatus::Qa && next == RequestStatus::Draft));
            }
            status = next;
        }
    }

    /// Property: cancelled tasks are final and completed tasks only reopen
    #[test]
    fn task_terminal_edges(from in task_status(), to in task_status()) {
        if from == TaskStatus::Cancelled {
            prop_assert!(!can_transition_task(from, to));
        }
        if from == TaskStatus::Completed && can_transition_task(from, to) {
            prop_assert_eq!(to, TaskStatus::Pending);
        }
        prop_assert!(!can_transition_task(from, from));
    }

    /// Property: every graph is a gap-free chain ending in non-retryable QA
    #[test]
    fn task_graphs_hold_their_contract(request_type in request_type()) {
        let graph = TaskGraphFactory::graph_for(request_type);
        prop_assert!(!graph.is_empty());

        let mut seen: HashSet<AgentRole> = HashSet::new();
        for (idx, blueprint) in graph.blueprints.iter().enumerate() {
            prop_assert_eq!(blueprint.sequence_order, idx as i32 + 1);
            for dependency in &blueprint.dependencies {
                prop_assert!(seen.contains(dependency));
            }
            prop_assert!(seen.insert(blueprint.agent_role), "roles are unique");
        }

        let last = graph.blueprints.last().unwrap();
        prop_assert_eq!(last.agent_role, AgentRole::Qa);
        prop_assert!(!last.retryable);
        prop_assert!(graph.blueprints[..graph.len() - 1].iter().all(|b| b.retryable));

        let total: u32 = graph.blueprints.iter().map(|b| b.estimated_duration_seconds).sum();
        prop_assert_eq!(TaskGraphFactory::estimated_total_duration(request_type), total);
    }

    /// Property: whatever prefix of a graph is complete, exactly the next
    /// pending task is ready
    #[test]
    fn ready_set_follows_completed_prefix(
        request_type in request_type(),
        completed in 0usize..6,
    ) {
        let request = NewContentRequest {
            brand_id: Uuid::new_v4(),
            campaign_id: None,
            request_type: request_type.as_str().to_string(),
            requirements: json!({}),
            settings: json!({}),
        }
        .into_request()
        .unwrap();
        let mut tasks = TaskGraphFactory::build_tasks(&request);
        let completed = completed.min(tasks.len());
        for task in tasks.iter_mut().take(completed) {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
        }

        let ready = ReadyTaskDiscovery::find_ready(&tasks);
        if completed == tasks.len() {
            prop_assert!(ready.is_empty());
            prop_assert!(ReadyTaskDiscovery::all_terminal(&tasks));
        } else {
            prop_assert_eq!(ready.len(), 1);
            prop_assert_eq!(ready[0].sequence_order, completed as i32 + 1);
            prop_assert_eq!(completed_roles(&tasks).len(), completed);
        }
    }
}
