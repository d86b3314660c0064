//! Live consumer of the event publisher: writes every recorded event to the
//! log stream so request history can be followed without querying the store.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::publisher::EventPublisher;

#[derive(Debug, Clone)]
pub struct EventRelay {
    publisher: EventPublisher,
}

impl EventRelay {
    pub fn new(publisher: EventPublisher) -> Self {
        Self { publisher }
    }

    /// Subscribe now and relay until `shutdown` flips or the publisher is
    /// dropped. The handle yields the number of events relayed.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<u64> {
        let mut receiver = self.publisher.subscribe();
        tokio::spawn(async move {
            let mut relayed = 0u64;
            loop {
                tokio::select! {
                    biased;
                    received = receiver.recv() => match received {
                        Ok(event) => {
                            relayed += 1;
                            info!(
                                request_id = %event.request_id,
                                task_id = ?event.task_id,
                                event_type = %event.event_type,
                                payload = %event.payload,
                                "📣 Request event"
                            );
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped = skipped, "Event relay fell behind; events dropped from the live stream");
                        }
                        Err(RecvError::Closed) => {
                            debug!("Event publisher closed");
                            break;
                        }
                    },
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!(relayed = relayed, "Event relay stopping");
            relayed
        })
    }
}
