//! Capability backed by an HTTP endpoint that accepts [`CapabilityParams`]
//! as JSON and answers with an [`AgentExecutionResult`].

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::capability::{AgentCapability, AgentExecutionResult, CapabilityParams};
use crate::config::CapabilityEndpoint;

#[derive(Debug, Clone)]
pub struct HttpAgentCapability {
    name: String,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpAgentCapability {
    pub fn new(name: impl Into<String>, endpoint: &CapabilityEndpoint, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            url: endpoint.url.clone(),
            timeout: Duration::from_millis(endpoint.timeout_ms),
            client,
        }
    }
}

#[async_trait]
impl AgentCapability for HttpAgentCapability {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, params: &CapabilityParams) -> AgentExecutionResult {
        debug!(capability = %self.name, task_id = %params.task_id, seed = params.seed, "Calling capability");

        let response = match self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(capability = %self.name, error = %err, "Capability request failed");
                return AgentExecutionResult::failed(format!("capability request failed: {err}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return AgentExecutionResult::failed(format!(
                "capability returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json::<AgentExecutionResult>()
            .await
            .unwrap_or_else(|err| AgentExecutionResult::failed(format!("invalid capability response: {err}")))
    }

    fn timeout_override(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}
