use tokio::sync::broadcast;

use crate::models::RequestEvent;

/// Live fan-out of recorded request events.
///
/// The event log is the durable record; subscribers here only see events
/// appended while they are listening.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<RequestEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: RequestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}
