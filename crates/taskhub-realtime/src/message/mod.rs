//! Outbound payloads, addressing, and the client-facing event envelope.

pub mod envelope;
pub mod payload;
pub mod text;

pub use envelope::EventEnvelope;
pub use payload::{Delivery, Payload, Target};
pub use text::SharedText;
