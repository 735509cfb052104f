//! Transport-neutral frame model.
//!
//! Sessions are generic over any `Sink<Frame>` / `Stream<Item = Result<Frame, _>>`
//! pair, so the pumps run unchanged over an axum WebSocket, a tungstenite
//! stream, or an in-memory channel in tests.

use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream};
use thiserror::Error;
use tokio::time;

use crate::message::SharedText;

/// A frame on a duplex connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 data frame.
    Text(SharedText),
    /// Binary data frame.
    Binary(Bytes),
    /// Liveness probe.
    Ping(Bytes),
    /// Liveness probe acknowledgement.
    Pong(Bytes),
    /// Graceful close.
    Close,
}

/// Errors raised by a connection. Always local to one session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer or the underlying socket is gone.
    #[error("connection closed")]
    Closed,
    /// A write did not complete within the write deadline.
    #[error("write deadline of {0:?} exceeded")]
    WriteTimeout(Duration),
    /// The underlying transport failed.
    #[error("transport failure: {0}")]
    Io(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wrap an underlying transport error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Box::new(err))
    }
}

/// Outbound half of a connection.
pub trait FrameSink: Sink<Frame, Error = TransportError> + Send + Unpin + 'static {}

impl<T> FrameSink for T where T: Sink<Frame, Error = TransportError> + Send + Unpin + 'static {}

/// Inbound half of a connection.
pub trait FrameStream: Stream<Item = Result<Frame, TransportError>> + Send + Unpin + 'static {}

impl<T> FrameStream for T where T: Stream<Item = Result<Frame, TransportError>> + Send + Unpin + 'static {}

/// Write one frame, bounded by `deadline`.
pub(crate) async fn write_frame<W: FrameSink>(
    sink: &mut W,
    frame: Frame,
    deadline: Duration,
) -> Result<(), TransportError> {
    match time::timeout(deadline, sink.send(frame)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::WriteTimeout(deadline)),
    }
}
