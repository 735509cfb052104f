//! Where upstream events come from.

use async_trait::async_trait;

use super::event::DomainEvent;

/// A stream of upstream domain events (a queue consumer, an in-process bus).
#[async_trait]
pub trait EventSource: Send + 'static {
    /// Next event, or `None` once the source is exhausted.
    async fn next_event(&mut self) -> Option<DomainEvent>;
}
