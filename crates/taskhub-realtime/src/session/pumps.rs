//! The two per-session pumps.
//!
//! The outbound pump owns the sink: it drains the mailbox, sends pings, and
//! hands the sink back to the supervisor when it stops. The inbound pump owns
//! the stream and enforces the read deadline. Both stop when the session's
//! cancellation token fires.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::heartbeat::SessionTimings;
use crate::message::Payload;
use crate::metrics::HubMetrics;

use super::close::{CloseGuard, close_connection};
use super::handle::SessionInfo;
use super::router::{InboundPayload, InboundRouter};
use super::transport::{Frame, FrameSink, FrameStream, TransportError, write_frame};

/// Why a pump (and therefore its session) stopped.
#[derive(Debug)]
pub enum ExitReason {
    /// The session supervisor stopped the pump after the other one exited.
    Stopped,
    /// The hub closed the mailbox (unregister or shutdown).
    MailboxClosed,
    /// The client sent a close frame.
    PeerClosed,
    /// The inbound stream ended without a close frame.
    StreamEnded,
    /// Nothing arrived within the read deadline.
    ReadTimeout(Duration),
    /// Reading failed.
    Read(TransportError),
    /// Writing failed or exceeded the write deadline.
    Write(TransportError),
    /// The hub refused the registration.
    HubUnavailable,
    /// A pump task panicked.
    Panicked,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::MailboxClosed => write!(f, "mailbox closed"),
            Self::PeerClosed => write!(f, "peer closed"),
            Self::StreamEnded => write!(f, "stream ended"),
            Self::ReadTimeout(deadline) => write!(f, "no frame within {deadline:?}"),
            Self::Read(e) => write!(f, "read failed: {e}"),
            Self::Write(e) => write!(f, "write failed: {e}"),
            Self::HubUnavailable => write!(f, "hub unavailable"),
            Self::Panicked => write!(f, "pump panicked"),
        }
    }
}

/// What the outbound pump hands back.
pub(crate) struct OutboundOutcome<W> {
    pub sink: W,
    pub reason: ExitReason,
    pub frames_sent: u64,
}

/// What the inbound pump hands back.
pub(crate) struct InboundOutcome {
    pub reason: ExitReason,
    pub frames_received: u64,
}

/// Drain the mailbox onto the wire and keep the heartbeat going.
pub(crate) async fn run_outbound<W: FrameSink>(
    mut mailbox: mpsc::Receiver<Payload>,
    mut sink: W,
    guard: Arc<CloseGuard>,
    timings: SessionTimings,
    stop: CancellationToken,
) -> OutboundOutcome<W> {
    let mut ping = timings.ping_ticker();
    let mut frames_sent = 0u64;

    let reason = loop {
        tokio::select! {
            biased;

            _ = stop.cancelled() => break ExitReason::Stopped,

            _ = ping.tick() => {
                if let Err(e) = write_frame(&mut sink, Frame::Ping(Bytes::new()), timings.write_timeout).await {
                    break ExitReason::Write(e);
                }
                trace!("Ping sent");
            }

            message = mailbox.recv() => match message {
                Some(payload) => {
                    if let Err(e) = write_frame(&mut sink, payload.into_frame(), timings.write_timeout).await {
                        break ExitReason::Write(e);
                    }
                    frames_sent += 1;
                }
                None => {
                    close_connection(&mut sink, &guard, timings.write_timeout).await;
                    break ExitReason::MailboxClosed;
                }
            },
        }
    };

    OutboundOutcome {
        sink,
        reason,
        frames_sent,
    }
}

/// Read frames until the peer leaves, misses the read deadline, or the
/// session is stopped. Every frame, pongs included, resets the deadline.
pub(crate) async fn run_inbound<R: FrameStream>(
    mut stream: R,
    session: SessionInfo,
    router: Arc<dyn InboundRouter>,
    timings: SessionTimings,
    metrics: Arc<HubMetrics>,
    stop: CancellationToken,
) -> InboundOutcome {
    let mut frames_received = 0u64;

    let reason = loop {
        let next = tokio::select! {
            biased;

            _ = stop.cancelled() => break ExitReason::Stopped,

            next = time::timeout(timings.read_timeout, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => break ExitReason::ReadTimeout(timings.read_timeout),
            Ok(None) => break ExitReason::StreamEnded,
            Ok(Some(Err(e))) => break ExitReason::Read(e),
            Ok(Some(Ok(frame))) => frame,
        };

        frames_received += 1;
        metrics.record_frame_received();

        match frame {
            Frame::Close => break ExitReason::PeerClosed,
            Frame::Ping(_) | Frame::Pong(_) => {
                trace!(session_id = %session.id, "Liveness frame received");
            }
            Frame::Text(text) => router.route(&session, InboundPayload::Text(text)).await,
            Frame::Binary(data) => router.route(&session, InboundPayload::Binary(data)).await,
        }
    };

    InboundOutcome {
        reason,
        frames_received,
    }
}
