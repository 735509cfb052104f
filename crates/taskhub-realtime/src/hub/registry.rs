//! The live session set, owned exclusively by the hub's control loop.
//!
//! Plain `HashMap`s: only one task ever touches this structure, so no
//! locking is involved.

use std::collections::{HashMap, HashSet};

use taskhub_core::types::{OwnerId, SessionId};

use crate::message::{Payload, Target};
use crate::session::handle::{Offer, SessionHandle, SessionInfo, SessionKey};

/// Outcome of inserting a session.
#[derive(Debug)]
pub enum Insert {
    /// The session is now live.
    Inserted,
    /// Another live session already has this ID; the newcomer is handed back.
    Duplicate(SessionHandle),
}

/// Outcome of removing a session.
#[derive(Debug)]
pub enum Remove {
    /// The session was live and has been removed.
    Removed(SessionHandle),
    /// No live session matched the key.
    Unknown,
}

/// Per-delivery fan-out tally.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Mailboxes the payload was queued into.
    pub queued: u64,
    /// Mailboxes that were full; the payload was dropped for them.
    pub dropped: u64,
    /// Sessions whose mailbox receiver is gone.
    pub closed: Vec<SessionKey>,
}

/// Session ID → handle, with an owner index.
#[derive(Debug, Default)]
pub struct LiveSet {
    by_id: HashMap<SessionId, SessionHandle>,
    by_owner: HashMap<OwnerId, HashSet<SessionId>>,
}

impl LiveSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session unless its ID is already live.
    pub fn insert(&mut self, handle: SessionHandle) -> Insert {
        let id = handle.id();
        if self.by_id.contains_key(&id) {
            return Insert::Duplicate(handle);
        }

        self.by_owner
            .entry(handle.owner().clone())
            .or_default()
            .insert(id);
        self.by_id.insert(id, handle);
        Insert::Inserted
    }

    /// Removes the session registered under exactly this key.
    pub fn remove(&mut self, key: &SessionKey) -> Remove {
        match self.by_id.get(&key.id) {
            Some(handle) if handle.key() == *key => {}
            _ => return Remove::Unknown,
        }

        let Some(handle) = self.by_id.remove(&key.id) else {
            return Remove::Unknown;
        };

        if let Some(sessions) = self.by_owner.get_mut(handle.owner()) {
            sessions.remove(&key.id);
            if sessions.is_empty() {
                self.by_owner.remove(handle.owner());
            }
        }

        Remove::Removed(handle)
    }

    /// Offers `payload` to every session matched by `target`, never waiting.
    pub fn deliver(&self, target: &Target, payload: &Payload) -> FanOut {
        let mut fan_out = FanOut::default();

        let mut offer = |handle: &SessionHandle| match handle.offer(payload.clone()) {
            Offer::Queued => fan_out.queued += 1,
            Offer::Full => fan_out.dropped += 1,
            Offer::Closed => fan_out.closed.push(handle.key()),
        };

        match target {
            Target::All => self.by_id.values().for_each(&mut offer),
            Target::Session(id) => {
                if let Some(handle) = self.by_id.get(id) {
                    offer(handle);
                }
            }
            Target::Owner(owner) => {
                if let Some(ids) = self.by_owner.get(owner) {
                    ids.iter()
                        .filter_map(|id| self.by_id.get(id))
                        .for_each(&mut offer);
                }
            }
        }

        fan_out
    }

    /// Whether a session ID is live.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of distinct owners with at least one live session.
    pub fn owner_count(&self) -> usize {
        self.by_owner.len()
    }

    /// Snapshot of all live sessions.
    pub fn infos(&self) -> Vec<SessionInfo> {
        self.by_id.values().map(|h| h.info().clone()).collect()
    }

    /// Removes and returns every session.
    pub fn drain(&mut self) -> Vec<SessionHandle> {
        self.by_owner.clear();
        self.by_id.drain().map(|(_, handle)| handle).collect()
    }
}
