//! Bridges between upstream domain events and the hub.

pub mod event;
pub mod event_bridge;
pub mod memory_bus;
pub mod source;

pub use event::{DomainEvent, Route};
pub use event_bridge::EventBridge;
pub use memory_bus::{BusSubscription, MemoryEventBus};
pub use source::EventSource;
