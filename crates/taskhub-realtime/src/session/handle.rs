//! The hub-side view of a client session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use taskhub_core::types::{OwnerId, SessionId};

use crate::message::Payload;

use super::lifecycle::SessionLifecycle;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Identifies one registration of a session.
///
/// The generation distinguishes two sessions that were (wrongly) given the
/// same ID, so a late unregister from one can never evict the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    /// Session ID.
    pub id: SessionId,
    /// Per-construction nonce.
    pub generation: u64,
}

/// Serializable snapshot of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session ID.
    pub id: SessionId,
    /// Owner the session authenticated as.
    pub owner: OwnerId,
    /// When the transport accepted the connection.
    pub connected_at: DateTime<Utc>,
}

/// Result of a non-blocking mailbox enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The payload is queued.
    Queued,
    /// The mailbox is at capacity; the payload was dropped for this session.
    Full,
    /// The outbound pump is gone; the session should leave the live set.
    Closed,
}

/// The only sender into a session's mailbox, owned by the hub once registered.
///
/// Dropping the handle closes the mailbox, which tells the outbound pump to
/// flush, send a close frame, and exit.
#[derive(Debug)]
pub struct SessionHandle {
    info: SessionInfo,
    generation: u64,
    mailbox: mpsc::Sender<Payload>,
    lifecycle: Arc<SessionLifecycle>,
}

impl SessionHandle {
    /// Create a handle and the mailbox receiver it feeds.
    pub fn new(
        id: SessionId,
        owner: OwnerId,
        mailbox_capacity: usize,
    ) -> (Self, mpsc::Receiver<Payload>, Arc<SessionLifecycle>) {
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        let lifecycle = Arc::new(SessionLifecycle::new());

        let handle = Self {
            info: SessionInfo {
                id,
                owner,
                connected_at: Utc::now(),
            },
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            mailbox: tx,
            lifecycle: lifecycle.clone(),
        };

        (handle, rx, lifecycle)
    }

    /// Session ID.
    pub fn id(&self) -> SessionId {
        self.info.id
    }

    /// Owner label.
    pub fn owner(&self) -> &OwnerId {
        &self.info.owner
    }

    /// Registration key.
    pub fn key(&self) -> SessionKey {
        SessionKey {
            id: self.info.id,
            generation: self.generation,
        }
    }

    /// Snapshot for queries and logs.
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Shared lifecycle state.
    pub fn lifecycle(&self) -> &Arc<SessionLifecycle> {
        &self.lifecycle
    }

    /// Enqueue without waiting. Never blocks the caller on a slow client.
    pub fn offer(&self, payload: Payload) -> Offer {
        match self.mailbox.try_send(payload) {
            Ok(()) => Offer::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Offer::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Offer::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_reports_full_then_closed() {
        let (handle, mut rx, _) = SessionHandle::new(SessionId::new(), OwnerId::from("u1"), 1);

        assert_eq!(handle.offer(Payload::from("a")), Offer::Queued);
        assert_eq!(handle.offer(Payload::from("b")), Offer::Full);
        assert_eq!(rx.try_recv().unwrap(), Payload::from("a"));

        drop(rx);
        assert_eq!(handle.offer(Payload::from("c")), Offer::Closed);
    }

    #[test]
    fn test_generations_are_unique_per_handle() {
        let id = SessionId::new();
        let (first, _rx1, _) = SessionHandle::new(id, OwnerId::from("u1"), 4);
        let (second, _rx2, _) = SessionHandle::new(id, OwnerId::from("u1"), 4);

        assert_eq!(first.key().id, second.key().id);
        assert_ne!(first.key(), second.key());
    }
}
