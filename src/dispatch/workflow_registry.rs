//! Static mapping from tasks to automation workflows.
//!
//! A task resolves to a [`WorkflowCategory`] by role, and producer tasks
//! further by task-name keywords and then request type. A category only
//! yields a target when a workflow id is configured for it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::config::DispatchSettings;
use crate::models::{AgentRole, RequestType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowCategory {
    Strategy,
    Copywriting,
    VideoProduction,
    VoiceoverSynthesis,
    ImageGeneration,
    Review,
}

impl WorkflowCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Copywriting => "copywriting",
            Self::VideoProduction => "video_production",
            Self::VoiceoverSynthesis => "voiceover_synthesis",
            Self::ImageGeneration => "image_generation",
            Self::Review => "review",
        }
    }

    /// Category for a task, before checking whether a workflow is configured
    pub fn select(task_name: &str, role: AgentRole, request_type: RequestType) -> Option<Self> {
        match role {
            AgentRole::Executive | AgentRole::TaskPlanner | AgentRole::Strategist => {
                Some(Self::Strategy)
            }
            AgentRole::Copywriter => Some(Self::Copywriting),
            AgentRole::Qa => Some(Self::Review),
            AgentRole::Producer => Self::select_production(task_name, request_type),
        }
    }

    fn select_production(task_name: &str, request_type: RequestType) -> Option<Self> {
        let name = task_name.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| name.contains(w));

        if mentions(&["video", "edit"]) {
            return Some(Self::VideoProduction);
        }
        if mentions(&["voiceover", "narration"]) {
            return Some(Self::VoiceoverSynthesis);
        }
        if mentions(&["image", "thumbnail", "visual"]) {
            return Some(Self::ImageGeneration);
        }

        match request_type {
            RequestType::Image | RequestType::Carousel => Some(Self::ImageGeneration),
            RequestType::VideoWithVo => Some(Self::VoiceoverSynthesis),
            RequestType::VideoNoVo => Some(Self::VideoProduction),
            RequestType::Text => None,
        }
    }
}

impl fmt::Display for WorkflowCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved automation target for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTarget {
    pub category: WorkflowCategory,
    pub workflow_id: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    workflow_ids: HashMap<WorkflowCategory, String>,
    video_timeout: Duration,
    image_timeout: Duration,
    default_timeout: Duration,
}

impl WorkflowRegistry {
    pub fn from_settings(settings: &DispatchSettings) -> Self {
        let ids = &settings.workflows;
        let configured = [
            (WorkflowCategory::Strategy, &ids.strategy),
            (WorkflowCategory::Copywriting, &ids.copywriting),
            (WorkflowCategory::VideoProduction, &ids.video_production),
            (WorkflowCategory::VoiceoverSynthesis, &ids.voiceover_synthesis),
            (WorkflowCategory::ImageGeneration, &ids.image_generation),
            (WorkflowCategory::Review, &ids.review),
        ];
        let workflow_ids = configured
            .into_iter()
            .filter_map(|(category, id)| {
                id.as_ref()
                    .filter(|id| !id.trim().is_empty())
                    .map(|id| (category, id.clone()))
            })
            .collect();

        Self {
            workflow_ids,
            video_timeout: Duration::from_millis(settings.video_timeout_ms),
            image_timeout: Duration::from_millis(settings.image_timeout_ms),
            default_timeout: Duration::from_millis(settings.default_timeout_ms),
        }
    }

    pub fn timeout_for(&self, category: WorkflowCategory) -> Duration {
        match category {
            WorkflowCategory::VideoProduction | WorkflowCategory::VoiceoverSynthesis => {
                self.video_timeout
            }
            WorkflowCategory::ImageGeneration => self.image_timeout,
            _ => self.default_timeout,
        }
    }

    pub fn workflow_id(&self, category: WorkflowCategory) -> Option<&str> {
        self.workflow_ids.get(&category).map(String::as_str)
    }

    pub fn resolve(
        &self,
        task_name: &str,
        role: AgentRole,
        request_type: RequestType,
    ) -> Option<WorkflowTarget> {
        let category = WorkflowCategory::select(task_name, role, request_type)?;
        let workflow_id = self.workflow_id(category)?;
        Some(WorkflowTarget {
            category,
            workflow_id: workflow_id.to_string(),
            timeout: self.timeout_for(category),
        })
    }

    /// Timeout for a direct call made on behalf of a task
    pub fn timeout_for_task(&self, task_name: &str, role: AgentRole, request_type: RequestType) -> Duration {
        WorkflowCategory::select(task_name, role, request_type)
            .map(|category| self.timeout_for(category))
            .unwrap_or(self.default_timeout)
    }

    pub fn is_empty(&self) -> bool {
        self.workflow_ids.is_empty()
    }
}
