//! Client sessions: one per accepted connection.
//!
//! A session is registered with the hub as a [`SessionHandle`] (the mailbox
//! sender) while [`ClientSession::run`] drives the connection with two pumps.

pub mod client;
pub mod close;
pub mod handle;
pub mod lifecycle;
pub mod pumps;
pub mod router;
pub mod transport;

pub use client::{ClientSession, SessionReport};
pub use close::CloseGuard;
pub use handle::{Offer, SessionHandle, SessionInfo, SessionKey};
pub use lifecycle::{SessionLifecycle, SessionState};
pub use pumps::ExitReason;
pub use router::{InboundPayload, InboundRouter, LoggingRouter};
pub use transport::{Frame, FrameSink, FrameStream, TransportError};
