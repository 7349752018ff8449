//! Print event stream
//!
//! Published for any push transport (websocket, SSE) that refreshes the UI.

use serde::Serialize;
use shared::models::PrintJob;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Event published by the print engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrintEvent {
    /// A job was created or changed status
    JobUpdated { job: PrintJob },
    /// Every active line of the order is in preparation
    OrderReady { order_id: i64 },
}

/// Broadcast bus for [`PrintEvent`]
///
/// Publishing never blocks; slow subscribers lag and miss events.
#[derive(Debug, Clone)]
pub struct PrintEventBus {
    tx: broadcast::Sender<PrintEvent>,
}

impl PrintEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: PrintEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No print event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrintEvent> {
        self.tx.subscribe()
    }
}

impl Default for PrintEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
