//! In-memory event bus for single-node deployments.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use super::event::DomainEvent;
use super::source::EventSource;

/// In-process fan-out of domain events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl MemoryEventBus {
    /// Create a bus that buffers up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers will see it.
    pub fn publish(&self, event: DomainEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One subscriber's view of a [`MemoryEventBus`].
#[derive(Debug)]
pub struct BusSubscription {
    rx: broadcast::Receiver<DomainEvent>,
}

#[async_trait]
impl EventSource for BusSubscription {
    async fn next_event(&mut self) -> Option<DomainEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
