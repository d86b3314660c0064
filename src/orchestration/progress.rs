//! # Progress Snapshot
//!
//! Read-only view of how far a request has come, computed from its status
//! and task set.
//!
//! ## Percentages
//!
//! - `completion_percentage`: completed tasks over total tasks
//! - `weighted_percentage`: the same, weighted by each task's estimated
//!   duration, with an in-progress task counting half
//!
//! A published request always reports 100.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{ContentRequest, RequestTask};
use crate::orchestration::task_graph::TaskGraphFactory;
use crate::state_machine::{stage_description, RequestStatus, StatusStage, TaskStatus};

/// Which lifecycle checkpoints a request has passed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Milestones {
    pub intake_complete: bool,
    pub draft_complete: bool,
    pub production_complete: bool,
    pub qa_complete: bool,
    pub published: bool,
}

impl Milestones {
    /// A checkpoint counts once the request has moved past it. A cancelled
    /// request keeps only what its completed tasks prove.
    fn from_state(status: RequestStatus, tasks: &[RequestTask]) -> Self {
        match status.ordinal() {
            Some(ordinal) => Self {
                intake_complete: ordinal >= 1,
                draft_complete: ordinal >= 2,
                production_complete: ordinal >= 3,
                qa_complete: ordinal >= 4,
                published: ordinal >= 4,
            },
            None => {
                let completed = |pred: fn(&RequestTask) -> bool| {
                    tasks
                        .iter()
                        .any(|t| t.status == TaskStatus::Completed && pred(t))
                };
                Self {
                    intake_complete: true,
                    draft_complete: completed(|t| t.agent_role.is_producer()),
                    production_complete: completed(|t| t.agent_role.is_producer()),
                    qa_complete: false,
                    published: false,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl TaskCounts {
    fn from_tasks(tasks: &[RequestTask]) -> Self {
        let mut counts = Self {
            total: tasks.len(),
            ..Default::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub stage: StatusStage,
    pub stage_description: String,
    /// Name of the task being worked on, or a status label when idle
    pub current_phase: String,
    /// 1-indexed position of the current task
    pub current_step: usize,
    pub total_steps: usize,
    pub completion_percentage: u8,
    pub weighted_percentage: u8,
    pub estimated_seconds_remaining: u32,
    pub milestones: Milestones,
    pub task_counts: TaskCounts,
}

impl ProgressSnapshot {
    pub fn build(request: &ContentRequest, tasks: &[RequestTask]) -> Self {
        let mut ordered: Vec<&RequestTask> = tasks.iter().collect();
        ordered.sort_by_key(|t| t.sequence_order);

        let published = request.status == RequestStatus::Published;
        let durations: Vec<u32> = ordered
            .iter()
            .map(|t| TaskGraphFactory::estimated_duration_for_task(request.request_type, t.agent_role))
            .collect();
        let total_weight: u32 = durations.iter().sum();

        let mut done_weight = 0.0_f64;
        let mut remaining = 0_u32;
        for (task, weight) in ordered.iter().zip(&durations) {
            match task.status {
                TaskStatus::Completed => done_weight += f64::from(*weight),
                TaskStatus::InProgress => {
                    done_weight += f64::from(*weight) / 2.0;
                    remaining += weight / 2;
                }
                TaskStatus::Pending => remaining += weight,
                TaskStatus::Failed | TaskStatus::Cancelled => {}
            }
        }

        let weighted_percentage = if published {
            100
        } else if total_weight == 0 {
            0
        } else {
            ((done_weight / f64::from(total_weight)) * 100.0).round() as u8
        };
        let completion_percentage = if published {
            100
        } else {
            TaskGraphFactory::completion_percentage(tasks)
        };
        if request.status.is_terminal() {
            remaining = 0;
        }

        let current = ordered
            .iter()
            .position(|t| t.status == TaskStatus::InProgress)
            .or_else(|| ordered.iter().position(|t| t.status == TaskStatus::Pending));
        let (current_step, current_phase) = match current {
            Some(idx) if !request.status.is_terminal() => (idx + 1, ordered[idx].name.clone()),
            _ => (ordered.len(), request.status.to_string()),
        };

        Self {
            request_id: request.id,
            status: request.status,
            stage: request.status.stage(),
            stage_description: stage_description(request.status).to_string(),
            current_phase,
            current_step,
            total_steps: ordered.len(),
            completion_percentage,
            weighted_percentage,
            estimated_seconds_remaining: remaining,
            milestones: Milestones::from_state(request.status, tasks),
            task_counts: TaskCounts::from_tasks(tasks),
        }
    }
}
