//! # Stage Payloads
//!
//! Outputs handed from one pipeline stage to the next. Agent capabilities
//! return loosely shaped JSON; these types give each role a schema so the
//! dispatch adapter can reject a malformed upstream output instead of
//! forwarding it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::request_task::RequestTask;
use super::request_type::AgentRole;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("{role} output must be a JSON object")]
    NotAnObject { role: AgentRole },

    #[error("{role} output is missing required field '{field}'")]
    MissingField { role: AgentRole, field: &'static str },

    #[error("{role} output is malformed: {source}")]
    Malformed {
        role: AgentRole,
        #[source]
        source: serde_json::Error,
    },

    #[error("{role} task has no output")]
    Empty { role: AgentRole },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IntentOutput {
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub validated: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlanOutput {
    #[serde(default)]
    pub plan: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StrategyOutput {
    #[serde(default)]
    pub strategic_brief: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScriptOutput {
    #[serde(default)]
    pub script_id: Option<String>,
    #[serde(default)]
    pub script: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProductionOutput {
    #[serde(default)]
    pub output_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutput {
    #[serde(default = "default_approved")]
    pub approved: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_approved() -> bool {
    true
}

/// Output of a completed stage, keyed by the role that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agent_role", content = "output", rename_all = "snake_case")]
pub enum StageOutput {
    Executive(IntentOutput),
    TaskPlanner(PlanOutput),
    Strategist(StrategyOutput),
    Copywriter(ScriptOutput),
    Producer(ProductionOutput),
    Qa(ReviewOutput),
}

impl StageOutput {
    /// Validate a raw output against the schema for `role`
    pub fn parse(role: AgentRole, value: Value) -> Result<Self, PayloadError> {
        if !value.is_object() {
            return Err(PayloadError::NotAnObject { role });
        }
        let malformed = |source| PayloadError::Malformed { role, source };

        let output = match role {
            AgentRole::Executive => Self::Executive(serde_json::from_value(value).map_err(malformed)?),
            AgentRole::TaskPlanner => {
                Self::TaskPlanner(serde_json::from_value(value).map_err(malformed)?)
            }
            AgentRole::Strategist => {
                Self::Strategist(serde_json::from_value(value).map_err(malformed)?)
            }
            AgentRole::Copywriter => {
                let script: ScriptOutput = serde_json::from_value(value).map_err(malformed)?;
                if script.script.is_none() && script.script_id.is_none() {
                    return Err(PayloadError::MissingField {
                        role,
                        field: "script",
                    });
                }
                Self::Copywriter(script)
            }
            AgentRole::Producer => {
                let production: ProductionOutput =
                    serde_json::from_value(value).map_err(malformed)?;
                if production
                    .output_url
                    .as_deref()
                    .map_or(true, |url| url.trim().is_empty())
                {
                    return Err(PayloadError::MissingField {
                        role,
                        field: "output_url",
                    });
                }
                Self::Producer(production)
            }
            AgentRole::Qa => Self::Qa(serde_json::from_value(value).map_err(malformed)?),
        };
        Ok(output)
    }

    /// Validate the stored output of a completed task.
    ///
    /// `output_url` lives in its own column, so it is folded back into the
    /// object before validation.
    pub fn from_task(task: &RequestTask) -> Result<Self, PayloadError> {
        let mut value = task
            .output_data
            .clone()
            .ok_or(PayloadError::Empty {
                role: task.agent_role,
            })?;
        if let (Some(url), Some(obj)) = (&task.output_url, value.as_object_mut()) {
            obj.entry("output_url")
                .or_insert_with(|| Value::String(url.clone()));
        }
        Self::parse(task.agent_role, value)
    }

    pub fn role(&self) -> AgentRole {
        match self {
            Self::Executive(_) => AgentRole::Executive,
            Self::TaskPlanner(_) => AgentRole::TaskPlanner,
            Self::Strategist(_) => AgentRole::Strategist,
            Self::Copywriter(_) => AgentRole::Copywriter,
            Self::Producer(_) => AgentRole::Producer,
            Self::Qa(_) => AgentRole::Qa,
        }
    }

    pub fn script_id(&self) -> Option<&str> {
        match self {
            Self::Copywriter(script) => script.script_id.as_deref(),
            _ => None,
        }
    }

    /// Inner output object without the role tag
    pub fn to_value(&self) -> Value {
        let tagged = serde_json::to_value(self).unwrap_or(Value::Null);
        tagged.get("output").cloned().unwrap_or(Value::Null)
    }
}
