//! Outbound payloads.
//!
//! Upstream outputs are validated through [`StageOutput`] before they are
//! forwarded, so a malformed stage fails here rather than inside the
//! automation system.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::error::DispatchError;
use crate::models::{AgentRole, ContentRequest, RequestTask, RequestType, StageOutput};
use crate::resilience::generate_key;
use crate::state_machine::TaskStatus;

pub const MAX_PROMPT_CHARS: usize = 500;
const DEFAULT_PROMPT: &str = "A professional creative image";

/// Body posted to an automation workflow. Field names follow the
/// automation system's contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPayload {
    pub request_id: Uuid,
    pub task_id: Uuid,
    #[serde(rename = "script_id")]
    pub script_id: Option<String>,
    #[serde(rename = "campaign_id")]
    pub campaign_id: Option<Uuid>,
    pub task_type: String,
    pub agent_role: AgentRole,
    pub content_type: RequestType,
    /// Validated outputs of completed tasks keyed by role
    pub input: Map<String, Value>,
    pub callback_url: String,
    #[serde(rename = "budget_tier")]
    pub budget_tier: String,
    pub metadata: Value,
}

impl DispatchPayload {
    pub fn build(
        request: &ContentRequest,
        task: &RequestTask,
        tasks: &[RequestTask],
        callback_base_url: &str,
        default_budget_tier: &str,
    ) -> Result<Self, DispatchError> {
        let outputs = completed_outputs(tasks)?;
        let script_id = outputs
            .iter()
            .find_map(|o| o.script_id().map(str::to_string));
        let input = outputs
            .iter()
            .map(|o| (o.role().to_string(), o.to_value()))
            .collect();

        let budget_tier = request
            .setting_str("tier")
            .or_else(|| request.setting_str("budget_tier"))
            .unwrap_or(default_budget_tier)
            .to_string();

        let mut metadata = Map::new();
        metadata.insert("request_type".into(), json!(request.request_type));
        metadata.insert("created_at".into(), json!(request.created_at));
        if let Some(extra) = request.settings.get("metadata").and_then(Value::as_object) {
            for (k, v) in extra {
                metadata.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        Ok(Self {
            request_id: request.id,
            task_id: task.id,
            script_id,
            campaign_id: request.campaign_id,
            task_type: task.name.clone(),
            agent_role: task.agent_role,
            content_type: request.request_type,
            input,
            callback_url: callback_url(callback_base_url, request.id, task.id),
            budget_tier,
            metadata: Value::Object(metadata),
        })
    }
}

/// `{base}/v1/callbacks/automation?requestId=..&taskId=..`
pub fn callback_url(base: &str, request_id: Uuid, task_id: Uuid) -> String {
    format!(
        "{}/v1/callbacks/automation?requestId={request_id}&taskId={task_id}",
        base.trim_end_matches('/')
    )
}

/// Key for one dispatch attempt of a task. Each pipeline retry and each
/// rework restart gets a new key; repeated sends of the same attempt share
/// one.
pub fn dispatch_idempotency_key(task: &RequestTask) -> String {
    generate_key(&json!({
        "requestId": task.request_id,
        "taskId": task.id,
        "attempt": task.retry_count,
        "startedAt": task.started_at,
    }))
}

/// Validated outputs of every completed task, in sequence order
pub fn completed_outputs(tasks: &[RequestTask]) -> Result<Vec<StageOutput>, DispatchError> {
    tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .map(|t| StageOutput::from_task(t).map_err(DispatchError::from))
        .collect()
}

/// Generation prompt from the request, flattened to one line and capped at
/// [`MAX_PROMPT_CHARS`]
pub fn generation_prompt(request: &ContentRequest) -> String {
    let raw = ["prompt", "brief", "description"]
        .iter()
        .find_map(|key| request.requirement_str(key))
        .unwrap_or(DEFAULT_PROMPT);

    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    cleaned.chars().take(MAX_PROMPT_CHARS).collect()
}

/// Pixel dimensions for an aspect ratio setting
pub fn image_dimensions(aspect_ratio: Option<&str>) -> (u32, u32) {
    match aspect_ratio {
        Some("16:9") => (1280, 720),
        Some("9:16") => (720, 1280),
        Some("4:5") => (800, 1000),
        _ => (1024, 1024),
    }
}
