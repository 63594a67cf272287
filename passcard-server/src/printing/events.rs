//! Print event channel

use shared::PrintEvent;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts job and batch events to every subscriber
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PrintEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrintEvent> {
        self.tx.subscribe()
    }

    /// Publish; events without subscribers are dropped
    pub fn emit(&self, event: PrintEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
