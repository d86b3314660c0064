use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request_type::RequestType;
use crate::error::{OrchestratorError, Result};
use crate::state_machine::RequestStatus;

/// A unit of creative work driven through the pipeline.
/// Maps to `content_requests` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub request_type: RequestType,
    pub status: RequestStatus,
    /// Opaque to the orchestrator, forwarded to agent capabilities
    pub requirements: serde_json::Value,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submission payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContentRequest {
    pub brand_id: Uuid,
    #[serde(default)]
    pub campaign_id: Option<Uuid>,
    pub request_type: String,
    #[serde(default = "empty_object")]
    pub requirements: serde_json::Value,
    #[serde(default = "empty_object")]
    pub settings: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl NewContentRequest {
    /// Parse the request type and build an `intake` request
    pub fn into_request(self) -> Result<ContentRequest> {
        let request_type: RequestType = self.request_type.parse()?;
        if !self.requirements.is_object() && !self.requirements.is_null() {
            return Err(OrchestratorError::Validation(
                "requirements must be a JSON object".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(ContentRequest {
            id: Uuid::new_v4(),
            brand_id: self.brand_id,
            campaign_id: self.campaign_id,
            request_type,
            status: RequestStatus::Intake,
            requirements: self.requirements,
            settings: self.settings,
            created_at: now,
            updated_at: now,
        })
    }
}

impl ContentRequest {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Look up a string setting, e.g. `aspect_ratio`
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }

    pub fn requirement_str(&self, key: &str) -> Option<&str> {
        self.requirements.get(key).and_then(|v| v.as_str())
    }
}
