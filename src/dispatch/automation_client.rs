//! Client for the external asynchronous automation system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::error::DispatchError;
use super::payload::DispatchPayload;

pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepted workflow execution; the result arrives later by callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub execution_id: String,
    pub workflow_id: String,
    pub status: String,
}

#[async_trait]
pub trait AutomationClient: Send + Sync {
    async fn execute_workflow(
        &self,
        workflow_id: &str,
        payload: &DispatchPayload,
        idempotency_key: &str,
        timeout: Duration,
    ) -> Result<WorkflowExecution, DispatchError>;

    async fn health_check(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct HttpAutomationClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpAutomationClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Execution id from `data.executionId`, falling back to a top-level
    /// `executionId`
    fn parse_execution(workflow_id: &str, body: &Value) -> Result<WorkflowExecution, DispatchError> {
        let data = body.get("data").unwrap_or(&Value::Null);
        let execution_id = data
            .get("executionId")
            .or_else(|| body.get("executionId"))
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::InvalidResponse("missing executionId".to_string()))?;
        let status = data
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("pending");

        Ok(WorkflowExecution {
            execution_id: execution_id.to_string(),
            workflow_id: workflow_id.to_string(),
            status: status.to_string(),
        })
    }
}

#[async_trait]
impl AutomationClient for HttpAutomationClient {
    async fn execute_workflow(
        &self,
        workflow_id: &str,
        payload: &DispatchPayload,
        idempotency_key: &str,
        timeout: Duration,
    ) -> Result<WorkflowExecution, DispatchError> {
        let url = format!("{}/api/v1/workflows/{workflow_id}/execute", self.base_url);
        debug!(url = %url, task_id = %payload.task_id, "Posting workflow execution");

        let response = self
            .with_key(self.client.post(&url))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DispatchError::InvalidResponse(e.to_string()))?;
        Self::parse_execution(workflow_id, &body)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .with_key(self.client.get(&url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
