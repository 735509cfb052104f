//! # taskhub-realtime
//!
//! Real-time connection hub for the TaskHub gateway. Provides:
//!
//! - A single control loop owning the live session set (register, unregister,
//!   broadcast, per-session and per-owner delivery)
//! - Client sessions with bounded, lossy outbound mailboxes and a
//!   close-exactly-once connection discipline
//! - Ping/pong liveness with read and write deadlines
//! - A bridge from upstream domain events to owner-addressed deliveries
//!
//! The hub is transport-agnostic: sessions run over any [`FrameSink`] /
//! [`FrameStream`] pair supplied by the transport adapter.

pub mod bridge;
pub mod heartbeat;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod server;
pub mod session;

pub use bridge::{DomainEvent, EventBridge, EventSource, MemoryEventBus};
pub use heartbeat::SessionTimings;
pub use hub::{Hub, HubError, HubHandle, HubStats, HubSummary};
pub use message::{Delivery, EventEnvelope, Payload, SharedText, Target};
pub use metrics::{HubMetrics, MetricsSnapshot};
pub use server::{EngineTasks, RealtimeEngine};
pub use session::{
    ClientSession, ExitReason, Frame, FrameSink, FrameStream, InboundPayload, InboundRouter,
    SessionInfo, SessionReport, TransportError,
};
