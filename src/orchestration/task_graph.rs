//! # Task Graph Factory
//!
//! Fixed task templates keyed by request type. Every graph is a linear chain
//! today, but blueprints carry an explicit dependency set so the ready-set
//! computation never assumes linearity.
//!
//! ## Contract
//!
//! - `sequence_order` runs `1..=n` without gaps
//! - the last blueprint is the QA role and is not retryable
//! - every other blueprint is retryable
//! - a dependency always points at an earlier blueprint

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AgentRole, ContentRequest, RequestTask, RequestType};
use crate::state_machine::TaskStatus;

/// Template for one task in a request's graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskBlueprint {
    pub name: &'static str,
    pub agent_role: AgentRole,
    pub sequence_order: i32,
    pub dependencies: Vec<AgentRole>,
    pub estimated_duration_seconds: u32,
    pub retryable: bool,
}

/// Ordered blueprints for a request type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskGraph {
    pub request_type: RequestType,
    pub description: &'static str,
    pub blueprints: Vec<TaskBlueprint>,
}

impl TaskGraph {
    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }

    pub fn roles(&self) -> Vec<AgentRole> {
        self.blueprints.iter().map(|b| b.agent_role).collect()
    }

    pub fn blueprint_for(&self, role: AgentRole) -> Option<&TaskBlueprint> {
        self.blueprints.iter().find(|b| b.agent_role == role)
    }
}

/// Chain builder: each stage depends on the one before it and the last
/// stage is the non-retryable QA review.
fn chain(
    request_type: RequestType,
    description: &'static str,
    stages: &[(&'static str, AgentRole, u32)],
) -> TaskGraph {
    let last = stages.len().saturating_sub(1);
    let blueprints = stages
        .iter()
        .enumerate()
        .map(|(idx, (name, role, secs))| TaskBlueprint {
            name: *name,
            agent_role: *role,
            sequence_order: idx as i32 + 1,
            dependencies: if idx == 0 {
                Vec::new()
            } else {
                vec![stages[idx - 1].1]
            },
            estimated_duration_seconds: *secs,
            retryable: idx != last,
        })
        .collect();

    TaskGraph {
        request_type,
        description,
        blueprints,
    }
}

const INTENT: &str = "Intent Parsing & Validation";
const PLANNING: &str = "Task Planning";
const REVIEW: &str = "Quality Assurance Review";

pub struct TaskGraphFactory;

impl TaskGraphFactory {
    pub fn graph_for(request_type: RequestType) -> TaskGraph {
        use AgentRole::*;
        match request_type {
            RequestType::VideoWithVo => chain(
                request_type,
                "Full video production with voiceover narration",
                &[
                    (INTENT, Executive, 5),
                    (PLANNING, TaskPlanner, 10),
                    ("Creative Strategy Generation", Strategist, 30),
                    ("Script Writing", Copywriter, 45),
                    ("Video Generation", Producer, 180),
                    (REVIEW, Qa, 10),
                ],
            ),
            RequestType::VideoNoVo => chain(
                request_type,
                "Visual-only video production without narration",
                &[
                    (INTENT, Executive, 5),
                    (PLANNING, TaskPlanner, 10),
                    ("Visual Strategy Generation", Strategist, 25),
                    ("Video Generation", Producer, 180),
                    (REVIEW, Qa, 10),
                ],
            ),
            RequestType::Image => chain(
                request_type,
                "Single image generation",
                &[
                    (INTENT, Executive, 5),
                    ("Visual Concept Generation", Strategist, 20),
                    ("Image Generation", Producer, 30),
                    (REVIEW, Qa, 5),
                ],
            ),
            RequestType::Text => chain(
                request_type,
                "Written copy such as captions or posts",
                &[
                    (INTENT, Executive, 5),
                    ("Copy Writing", Copywriter, 30),
                    (REVIEW, Qa, 5),
                ],
            ),
            RequestType::Carousel => chain(
                request_type,
                "Multi-slide image carousel",
                &[
                    ("Carousel Concept Generation", Strategist, 20),
                    ("Carousel Image Generation", Producer, 60),
                    (REVIEW, Qa, 5),
                ],
            ),
        }
    }

    /// Graph lookup by raw type name; unknown names are rejected
    pub fn graph_for_name(request_type: &str) -> Result<TaskGraph> {
        let parsed: RequestType = request_type.parse()?;
        Ok(Self::graph_for(parsed))
    }

    pub fn estimated_total_duration(request_type: RequestType) -> u32 {
        Self::graph_for(request_type)
            .blueprints
            .iter()
            .map(|b| b.estimated_duration_seconds)
            .sum()
    }

    /// Zero when the role does not appear in the graph
    pub fn estimated_duration_for_task(request_type: RequestType, role: AgentRole) -> u32 {
        Self::graph_for(request_type)
            .blueprint_for(role)
            .map(|b| b.estimated_duration_seconds)
            .unwrap_or(0)
    }

    /// Materialize the full task set for a request, all pending
    pub fn build_tasks(request: &ContentRequest) -> Vec<RequestTask> {
        let now = Utc::now();
        Self::graph_for(request.request_type)
            .blueprints
            .into_iter()
            .map(|blueprint| RequestTask {
                id: Uuid::new_v4(),
                request_id: request.id,
                name: blueprint.name.to_string(),
                agent_role: blueprint.agent_role,
                sequence_order: blueprint.sequence_order,
                input_data: initial_input(request, blueprint.agent_role),
                dependencies: blueprint.dependencies,
                status: TaskStatus::Pending,
                retryable: blueprint.retryable,
                retry_count: 0,
                output_data: None,
                output_url: None,
                error_message: None,
                started_at: None,
                completed_at: None,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    /// Share of completed tasks, rounded to a whole percent
    pub fn completion_percentage(tasks: &[RequestTask]) -> u8 {
        if tasks.is_empty() {
            return 0;
        }
        let completed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        ((completed as f64 / tasks.len() as f64) * 100.0).round() as u8
    }
}

/// Settings keys each role receives in its initial input
fn settings_keys(role: AgentRole) -> &'static [&'static str] {
    match role {
        AgentRole::Executive => &["duration_seconds", "aspect_ratio", "style_preset"],
        AgentRole::TaskPlanner => &["duration_seconds", "aspect_ratio"],
        AgentRole::Strategist => &["duration_seconds", "style_preset", "aspect_ratio"],
        AgentRole::Copywriter => &["duration_seconds", "voice_id", "auto_script", "script_text"],
        AgentRole::Producer => &[
            "duration_seconds",
            "aspect_ratio",
            "shot_type",
            "preferred_provider",
            "provider_tier",
        ],
        AgentRole::Qa => &[],
    }
}

fn initial_input(request: &ContentRequest, role: AgentRole) -> Value {
    let mut settings = Map::new();
    for key in settings_keys(role) {
        if let Some(value) = request.settings.get(*key) {
            settings.insert((*key).to_string(), value.clone());
        }
    }

    json!({
        "request_id": request.id,
        "request_type": request.request_type,
        "brand_id": request.brand_id,
        "campaign_id": request.campaign_id,
        "requirements": request.requirements,
        "settings": settings,
    })
}
