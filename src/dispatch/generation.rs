//! Direct synchronous generation through a registered capability.

use rand::Rng;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::AgentRole;
use crate::registry::{AgentCapability, AgentExecutionResult, CapabilityParams};

/// Seeds are drawn below this bound
pub const SEED_RANGE: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Succeeded {
        output: Value,
        output_url: Option<String>,
        attempts: u32,
    },
    Failed {
        message: String,
        attempts: u32,
    },
}

/// Run `capability` up to `attempts` times, each with a fresh seed, pausing
/// `retry_delay` between attempts. A timed-out attempt counts as a failure.
pub async fn generate_with_attempts(
    capability: Arc<dyn AgentCapability>,
    mut params: CapabilityParams,
    attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
) -> GenerationResult {
    let attempts = attempts.max(1);
    let timeout = capability.timeout_override().unwrap_or(timeout);
    let mut last_error = String::from("generation failed");

    for attempt in 1..=attempts {
        params.seed = rand::thread_rng().gen_range(0..SEED_RANGE);
        debug!(
            capability = capability.name(),
            attempt = attempt,
            seed = params.seed,
            "🎲 Direct generation attempt"
        );

        let result = match tokio::time::timeout(timeout, capability.execute(&params)).await {
            Ok(result) => result,
            Err(_) => AgentExecutionResult::failed(format!("timed out after {timeout:?}")),
        };

        let result = reject_empty(params.agent_role, result);
        if result.success {
            return GenerationResult::Succeeded {
                output: annotate_output(result.output, params.seed, attempt),
                output_url: result.output_url,
                attempts: attempt,
            };
        }

        last_error = result
            .error
            .unwrap_or_else(|| "capability reported failure".to_string());
        warn!(
            capability = capability.name(),
            attempt = attempt,
            max_attempts = attempts,
            error = %last_error,
            "Direct generation attempt failed"
        );
        if attempt < attempts {
            tokio::time::sleep(retry_delay).await;
        }
    }

    GenerationResult::Failed {
        message: last_error,
        attempts,
    }
}

/// A reported success with nothing usable is a failed attempt. Producers
/// must hand back an asset URL; every other role needs a non-empty output.
fn reject_empty(role: AgentRole, result: AgentExecutionResult) -> AgentExecutionResult {
    if !result.success {
        return result;
    }
    let has_url = |url: Option<&str>| url.is_some_and(|u| !u.trim().is_empty());
    let url_in_output = result
        .output
        .as_ref()
        .and_then(|o| o.get("output_url"))
        .and_then(Value::as_str);
    let empty_output = match &result.output {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    };

    if role == AgentRole::Producer {
        if !has_url(result.output_url.as_deref()) && !has_url(url_in_output) {
            return AgentExecutionResult::failed("capability returned no output_url");
        }
    } else if empty_output && !has_url(result.output_url.as_deref()) {
        return AgentExecutionResult::failed("capability returned an empty result");
    }
    result
}

/// Stage outputs must be objects; wrap anything else and record the seed
fn annotate_output(output: Option<Value>, seed: u64, attempts: u32) -> Value {
    let mut object = match output {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
        None => Map::new(),
    };
    object.insert(
        "generation".to_string(),
        json!({ "seed": seed, "attempts": attempts }),
    );
    Value::Object(object)
}
