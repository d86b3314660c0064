//! # Request Lifecycle
//!
//! Applies request status changes through the store's compare-and-swap and
//! records each one in the event log.
//!
//! Status follows task progress. `advance_to` walks the happy path one legal
//! edge at a time, so a graph without a producer still passes through
//! `production` on its way to `qa`.

use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};
use crate::events::EventLog;
use crate::logging::log_request_operation;
use crate::models::AgentRole;
use crate::state_machine::{forward_path, validate_transition, RequestStatus};
use crate::store::{CasResult, RequestStore};

/// Bound on re-reads when concurrent writers keep moving the status
const MAX_CAS_ROUNDS: usize = 8;

/// Request status a role's task start implies, if any
pub fn status_for_started_role(role: AgentRole) -> Option<RequestStatus> {
    match role {
        AgentRole::Producer => Some(RequestStatus::Production),
        AgentRole::Qa => Some(RequestStatus::Qa),
        _ => None,
    }
}

#[derive(Clone)]
pub struct RequestLifecycle {
    store: Arc<dyn RequestStore>,
    events: EventLog,
}

impl std::fmt::Debug for RequestLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLifecycle").finish()
    }
}

impl RequestLifecycle {
    pub fn new(store: Arc<dyn RequestStore>, events: EventLog) -> Self {
        Self { store, events }
    }

    async fn current_status(&self, request_id: Uuid) -> Result<RequestStatus> {
        self.store
            .get_request(request_id)
            .await?
            .map(|r| r.status)
            .ok_or(OrchestratorError::RequestNotFound(request_id))
    }

    /// Apply `from -> to`. `Ok(false)` when the stored status was no longer
    /// `from`.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn transition(
        &self,
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        reason: &str,
    ) -> Result<bool> {
        validate_transition(from, to).into_result()?;

        match self.store.cas_request_status(request_id, from, to).await? {
            CasResult::Success => {
                self.events.status_changed(request_id, from, to, reason).await;
                log_request_operation(
                    "status_change",
                    request_id,
                    None,
                    &to.to_string(),
                    Some(&format!("{from} -> {to}: {reason}")),
                );
                Ok(true)
            }
            CasResult::NotFound => Err(OrchestratorError::RequestNotFound(request_id)),
            CasResult::StateMismatch { actual } => {
                debug!(
                    expected = %from,
                    actual = %actual,
                    "Request status moved underneath transition"
                );
                Ok(false)
            }
        }
    }

    /// Walk forward along the happy path until `target` is reached. Returns
    /// the final status, which is the current one untouched when `target`
    /// is not ahead of it.
    pub async fn advance_to(
        &self,
        request_id: Uuid,
        target: RequestStatus,
        reason: &str,
    ) -> Result<RequestStatus> {
        let mut current = self.current_status(request_id).await?;
        'rounds: for _ in 0..MAX_CAS_ROUNDS {
            let path = forward_path(current, target);
            if path.is_empty() {
                return Ok(current);
            }
            for next in path {
                if !self.transition(request_id, current, next, reason).await? {
                    current = self.current_status(request_id).await?;
                    continue 'rounds;
                }
                current = next;
            }
            return Ok(current);
        }
        Ok(current)
    }

    /// Move a non-terminal request to `cancelled`. Returns `false` when the
    /// request was already terminal.
    pub async fn cancel(&self, request_id: Uuid, reason: &str) -> Result<bool> {
        for _ in 0..MAX_CAS_ROUNDS {
            let current = self.current_status(request_id).await?;
            if current.is_terminal() {
                return Ok(false);
            }
            if self
                .transition(request_id, current, RequestStatus::Cancelled, reason)
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
