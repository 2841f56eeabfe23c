use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::host::HostEvent;

/// Fan-out for host push events.
///
/// Process host implementations publish every output/exit event here; each
/// subscriber gets its own unbounded channel, so per-session ordering is the
/// publish order. Closed subscribers are pruned on the next publish.
#[derive(Default)]
pub struct HostEventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<HostEvent>>>,
}

impl HostEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    pub fn publish(&self, event: HostEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
