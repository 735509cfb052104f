//! Session lifecycle state machine.
//!
//! `Connecting → Active → Closing → Closed`. Transitions only move forward
//! and `Closed` is terminal. The state is shared between the session's
//! supervisor and the hub's control loop, which flips `Connecting → Active`
//! when it accepts the registration.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SessionState {
    /// Accepted by the transport, not yet in the live set.
    Connecting = 0,
    /// In the live set and eligible for deliveries.
    Active = 1,
    /// A pump failed, the mailbox closed, or the hub unregistered it.
    Closing = 2,
    /// Both pumps exited and the connection is closed.
    Closed = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Active,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Active => write!(f, "active"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Atomically updated [`SessionState`].
#[derive(Debug)]
pub struct SessionLifecycle {
    state: AtomicU8,
}

impl SessionLifecycle {
    /// A new lifecycle in `Connecting`.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Connecting as u8),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `Connecting → Active`. Fails if the session already started closing,
    /// which happens when its teardown raced ahead of the registration.
    pub fn activate(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move forward to `next`. Returns `false` if the state was already at
    /// or beyond `next`.
    pub fn advance(&self, next: SessionState) -> bool {
        let target = next as u8;
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < target).then_some(target)
            })
            .is_ok()
    }

    /// Whether the session is past `Active`.
    pub fn is_terminating(&self) -> bool {
        self.state() >= SessionState::Closing
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
