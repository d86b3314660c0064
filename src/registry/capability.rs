//! # Agent Capabilities
//!
//! Black-box synchronous workers. The orchestrator never inspects how a
//! capability produces content; it only hands over parameters and reads back
//! a success flag, an output and an optional asset URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{AgentRole, RequestType};

/// Parameters for one direct generation attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityParams {
    pub request_id: Uuid,
    pub task_id: Uuid,
    pub task_name: String,
    pub agent_role: AgentRole,
    pub request_type: RequestType,
    pub prompt: String,
    /// Fresh per attempt so a retry can produce a different result
    pub seed: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub payload: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub output_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AgentExecutionResult {
    pub fn succeeded(output: Value, output_url: Option<String>) -> Self {
        Self {
            success: true,
            output: Some(output),
            output_url,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            output_url: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait AgentCapability: Send + Sync {
    fn name(&self) -> &str;

    /// Run the capability. Failures are reported in the result, not as `Err`.
    async fn execute(&self, params: &CapabilityParams) -> AgentExecutionResult;

    /// Per-call timeout; the dispatcher's category timeout applies when `None`
    fn timeout_override(&self) -> Option<Duration> {
        None
    }
}
