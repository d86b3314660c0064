use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a content request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Request accepted, task graph being built
    #[default]
    Intake,
    /// Planning, strategy and scripting
    Draft,
    /// Producer work in flight
    Production,
    /// Final review
    Qa,
    /// Delivered
    Published,
    /// Stopped by failure or by an operator
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 6] = [
        Self::Intake,
        Self::Draft,
        Self::Production,
        Self::Qa,
        Self::Published,
        Self::Cancelled,
    ];

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Cancelled)
    }

    /// Position along the happy path, `None` for cancelled
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            Self::Intake => Some(0),
            Self::Draft => Some(1),
            Self::Production => Some(2),
            Self::Qa => Some(3),
            Self::Published => Some(4),
            Self::Cancelled => None,
        }
    }

    /// Coarse grouping used by progress views
    pub fn stage(&self) -> StatusStage {
        match self {
            Self::Intake | Self::Draft => StatusStage::Planning,
            Self::Production => StatusStage::Execution,
            Self::Qa => StatusStage::Review,
            Self::Published | Self::Cancelled => StatusStage::Complete,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::Draft => write!(f, "draft"),
            Self::Production => write!(f, "production"),
            Self::Qa => write!(f, "qa"),
            Self::Published => write!(f, "published"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intake" => Ok(Self::Intake),
            "draft" => Ok(Self::Draft),
            "production" => Ok(Self::Production),
            "qa" => Ok(Self::Qa),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid request status: {s}")),
        }
    }
}

/// Status of a single task within a request's graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Resolved outcome; only an operator retry or rework moves it back to pending
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Failed tasks may be retried by an operator
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Whether a task in this status satisfies a dependency edge
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// UI grouping of request statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusStage {
    Planning,
    Execution,
    Review,
    Complete,
}

impl StatusStage {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Planning => "Planning & Strategy",
            Self::Execution => "Production & Execution",
            Self::Review => "Quality Assurance & Review",
            Self::Complete => "Complete",
        }
    }
}

impl fmt::Display for StatusStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Execution => write!(f, "execution"),
            Self::Review => write!(f, "review"),
            Self::Complete => write!(f, "complete"),
        }
    }
}
