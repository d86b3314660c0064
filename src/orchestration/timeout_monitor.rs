//! # Task Timeout Monitor
//!
//! Background sweep over in-flight work.
//!
//! ## Sweep
//!
//! 1. Every `in_progress` task that has run longer than its role's timeout
//!    is failed with `TASK_TIMEOUT` through the normal resume path, so it
//!    consumes a pipeline retry like any other failure.
//! 2. Every live request gets a processing pass, which picks up tasks
//!    deferred while a circuit was open.
//!
//! An error on one task or request is logged and counted; the sweep moves on.
//!
//! ## Lifecycle
//!
//! Spawned by the server binary; stops when the shutdown channel flips.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::orchestrator::RequestOrchestrator;
use super::ready_task_discovery::ReadyTaskDiscovery;
use super::types::{TaskOutcome, TASK_TIMEOUT_CODE};
use crate::config::TaskTimeoutSettings;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub timed_out: usize,
    pub reprocessed: usize,
    /// Tasks or requests skipped after an error; the next sweep retries them
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct TaskTimeoutMonitor {
    orchestrator: Arc<RequestOrchestrator>,
    timeouts: TaskTimeoutSettings,
    interval: Duration,
}

impl TaskTimeoutMonitor {
    pub fn new(
        orchestrator: Arc<RequestOrchestrator>,
        timeouts: TaskTimeoutSettings,
        interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            timeouts,
            interval,
        }
    }

    /// One pass over timed-out tasks and live requests
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();
        let store = self.orchestrator.store();
        let now = Utc::now();

        for task in store.list_in_progress_tasks().await? {
            let limit = self.timeouts.timeout_for(task.agent_role);
            let Some(elapsed) = task.running_for(now).and_then(|d| d.to_std().ok()) else {
                continue;
            };
            if elapsed <= limit {
                continue;
            }

            warn!(
                request_id = %task.request_id,
                task_id = %task.id,
                agent_role = %task.agent_role,
                elapsed_seconds = elapsed.as_secs(),
                limit_seconds = limit.as_secs(),
                "⏰ Task exceeded its timeout"
            );
            let outcome = TaskOutcome::failed(
                TASK_TIMEOUT_CODE,
                format!(
                    "{} task exceeded {}s without a result",
                    task.agent_role,
                    limit.as_secs()
                ),
                true,
            );
            match self.orchestrator.resume(task.id, outcome).await {
                Ok(result) if result.applied() => summary.timed_out += 1,
                Ok(_) => {}
                Err(err) => {
                    warn!(task_id = %task.id, error = %err, "Timing out task failed");
                    summary.failed += 1;
                }
            }
        }

        for request in store.list_active_requests().await? {
            let tasks = match store.list_tasks(request.id).await {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(request_id = %request.id, error = %err, "Listing tasks for sweep failed");
                    summary.failed += 1;
                    continue;
                }
            };
            if ReadyTaskDiscovery::find_ready(&tasks).is_empty() {
                continue;
            }
            match self.orchestrator.process_request(request.id).await {
                Ok(_) => summary.reprocessed += 1,
                Err(err) => {
                    warn!(request_id = %request.id, error = %err, "Sweep processing pass failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Run `sweep` on an interval until `shutdown` becomes true
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            info!(
                interval_seconds = self.interval.as_secs(),
                "🕐 Task timeout monitor started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.sweep().await {
                            Ok(summary) if summary != SweepSummary::default() => {
                                info!(
                                    timed_out = summary.timed_out,
                                    reprocessed = summary.reprocessed,
                                    failed = summary.failed,
                                    "Timeout sweep completed"
                                );
                            }
                            Ok(_) => debug!("Timeout sweep found nothing to do"),
                            Err(err) => error!(error = %err, "Timeout sweep failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Task timeout monitor stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}
