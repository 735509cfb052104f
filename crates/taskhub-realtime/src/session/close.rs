//! Close-exactly-once discipline for a session's physical connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::SinkExt;
use tokio::time;
use tracing::debug;

use super::transport::{Frame, FrameSink, write_frame};

/// Shared between both pumps and the session supervisor; the first caller
/// to acquire it performs the close, every later caller is a no-op.
#[derive(Debug, Default)]
pub struct CloseGuard {
    closed: AtomicBool,
}

impl CloseGuard {
    /// Create an unclaimed guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to close. Returns `true` for exactly one caller.
    pub fn try_acquire(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Whether the connection has been (or is being) closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Send a close frame and shut the sink, unless someone already did.
///
/// Both steps are best effort and bounded by `deadline`; a peer that has
/// already vanished cannot hold the session open.
pub(crate) async fn close_connection<W: FrameSink>(
    sink: &mut W,
    guard: &CloseGuard,
    deadline: Duration,
) -> bool {
    if !guard.try_acquire() {
        return false;
    }

    if let Err(e) = write_frame(sink, Frame::Close, deadline).await {
        debug!(error = %e, "Close frame not delivered");
    }

    match time::timeout(deadline, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "Connection close failed"),
        Err(_) => debug!(?deadline, "Connection close timed out"),
    }

    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::session::transport::mock;

    #[tokio::test]
    async fn test_only_one_concurrent_acquirer_wins() {
        let guard = Arc::new(CloseGuard::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let guard = guard.clone();
            let winners = winners.clone();
            tasks.push(tokio::spawn(async move {
                if guard.try_acquire() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(guard.is_closed());
    }

    #[tokio::test]
    async fn test_close_connection_writes_one_close_frame() {
        let (mut sink, _stream, peer) = mock::connection();
        let guard = CloseGuard::new();

        assert!(close_connection(&mut sink, &guard, Duration::from_secs(1)).await);
        assert!(!close_connection(&mut sink, &guard, Duration::from_secs(1)).await);
        drop(sink);

        assert_eq!(peer.drain().await, vec![Frame::Close]);
    }
}
