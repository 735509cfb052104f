//! Hub-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters updated by the hub loop and the session pumps.
#[derive(Debug)]
pub struct HubMetrics {
    /// Sessions that entered the live set
    pub sessions_registered: AtomicU64,
    /// Sessions that left the live set through unregister
    pub sessions_unregistered: AtomicU64,
    /// Sessions currently live
    pub sessions_active: AtomicU64,
    /// Payloads queued into a mailbox (counted per recipient)
    pub payloads_delivered: AtomicU64,
    /// Payloads dropped because a mailbox was full (counted per recipient)
    pub payloads_dropped: AtomicU64,
    /// Sessions removed because their mailbox receiver was gone
    pub sessions_evicted: AtomicU64,
    /// Registrations rejected because the ID was already live
    pub duplicate_registrations: AtomicU64,
    /// Unregisters for sessions that were not live
    pub unknown_unregistrations: AtomicU64,
    /// Registrations skipped because the session was already closing
    pub stale_registrations: AtomicU64,
    /// Frames read from clients
    pub frames_received: AtomicU64,
}

impl HubMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self {
            sessions_registered: AtomicU64::new(0),
            sessions_unregistered: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            payloads_delivered: AtomicU64::new(0),
            payloads_dropped: AtomicU64::new(0),
            sessions_evicted: AtomicU64::new(0),
            duplicate_registrations: AtomicU64::new(0),
            unknown_unregistrations: AtomicU64::new(0),
            stale_registrations: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_registered(&self) {
        self.sessions_registered.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unregistered(&self) {
        self.sessions_unregistered.fetch_add(1, Ordering::Relaxed);
        self.dec_active(1);
    }

    pub(crate) fn record_evicted(&self) {
        self.sessions_evicted.fetch_add(1, Ordering::Relaxed);
        self.dec_active(1);
    }

    /// Sessions released in bulk at shutdown.
    pub(crate) fn record_drained(&self, count: u64) {
        self.dec_active(count);
    }

    pub(crate) fn record_fan_out(&self, delivered: u64, dropped: u64) {
        if delivered > 0 {
            self.payloads_delivered.fetch_add(delivered, Ordering::Relaxed);
        }
        if dropped > 0 {
            self.payloads_dropped.fetch_add(dropped, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicate_registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown_unregister(&self) {
        self.unknown_unregistrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self) {
        self.stale_registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    fn dec_active(&self, count: u64) {
        let _ = self
            .sessions_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(count))
            });
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_registered: self.sessions_registered.load(Ordering::Relaxed),
            sessions_unregistered: self.sessions_unregistered.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            payloads_delivered: self.payloads_delivered.load(Ordering::Relaxed),
            payloads_dropped: self.payloads_dropped.load(Ordering::Relaxed),
            sessions_evicted: self.sessions_evicted.load(Ordering::Relaxed),
            duplicate_registrations: self.duplicate_registrations.load(Ordering::Relaxed),
            unknown_unregistrations: self.unknown_unregistrations.load(Ordering::Relaxed),
            stale_registrations: self.stale_registrations.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
        }
    }
}

impl Default for HubMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub sessions_registered: u64,
    pub sessions_unregistered: u64,
    pub sessions_active: u64,
    pub payloads_delivered: u64,
    pub payloads_dropped: u64,
    pub sessions_evicted: u64,
    pub duplicate_registrations: u64,
    pub unknown_unregistrations: u64,
    pub stale_registrations: u64,
    pub frames_received: u64,
}
