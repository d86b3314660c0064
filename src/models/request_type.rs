use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::OrchestratorError;

/// Kind of content a request produces; selects the task graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    VideoWithVo,
    VideoNoVo,
    Image,
    Text,
    Carousel,
}

impl RequestType {
    pub const ALL: [RequestType; 5] = [
        Self::VideoWithVo,
        Self::VideoNoVo,
        Self::Image,
        Self::Text,
        Self::Carousel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VideoWithVo => "video_with_vo",
            Self::VideoNoVo => "video_no_vo",
            Self::Image => "image",
            Self::Text => "text",
            Self::Carousel => "carousel",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::VideoWithVo | Self::VideoNoVo)
    }

    pub fn is_visual(&self) -> bool {
        matches!(self, Self::Image | Self::Carousel)
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestType {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video_with_vo" => Ok(Self::VideoWithVo),
            "video_no_vo" => Ok(Self::VideoNoVo),
            "image" => Ok(Self::Image),
            "text" => Ok(Self::Text),
            "carousel" => Ok(Self::Carousel),
            other => Err(OrchestratorError::UnknownRequestType(other.to_string())),
        }
    }
}

/// Category of work a pipeline stage performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Executive,
    TaskPlanner,
    Strategist,
    Copywriter,
    Producer,
    Qa,
}

impl AgentRole {
    pub const ALL: [AgentRole; 6] = [
        Self::Executive,
        Self::TaskPlanner,
        Self::Strategist,
        Self::Copywriter,
        Self::Producer,
        Self::Qa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executive => "executive",
            Self::TaskPlanner => "task_planner",
            Self::Strategist => "strategist",
            Self::Copywriter => "copywriter",
            Self::Producer => "producer",
            Self::Qa => "qa",
        }
    }

    /// Producer-class tasks move a request into production when they start
    pub fn is_producer(&self) -> bool {
        matches!(self, Self::Producer)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executive" => Ok(Self::Executive),
            "task_planner" => Ok(Self::TaskPlanner),
            "strategist" => Ok(Self::Strategist),
            "copywriter" => Ok(Self::Copywriter),
            "producer" => Ok(Self::Producer),
            "qa" => Ok(Self::Qa),
            _ => Err(format!("Invalid agent role: {s}")),
        }
    }
}
