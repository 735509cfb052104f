//! The hub control loop.
//!
//! One task owns the [`LiveSet`] and serves every intake. Shutdown is
//! checked ahead of everything else. The data intakes (delivery, register,
//! unregister, query) are polled without a fixed order, so a flood on one
//! of them cannot starve the others. Before a query is answered, the
//! requests already waiting on the other intakes are applied, so a query
//! observes every request submitted before it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use taskhub_core::config::RealtimeConfig;
use taskhub_core::types::SessionId;

use crate::message::Delivery;
use crate::metrics::HubMetrics;
use crate::session::handle::{SessionHandle, SessionInfo, SessionKey};
use crate::session::lifecycle::SessionState;

use super::handle::HubHandle;
use super::registry::{Insert, LiveSet, Remove};

/// Read-only requests answered by the control loop.
#[derive(Debug)]
pub enum HubQuery {
    /// Live session and owner counts.
    Stats(oneshot::Sender<HubStats>),
    /// Every live session.
    Sessions(oneshot::Sender<Vec<SessionInfo>>),
    /// Whether one session ID is live.
    IsLive(SessionId, oneshot::Sender<bool>),
}

/// Live-set counts at the time the query was served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Live sessions.
    pub sessions: usize,
    /// Distinct owners with at least one live session.
    pub owners: usize,
}

/// What the control loop did on its way out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubSummary {
    /// Live sessions whose mailboxes were closed.
    pub sessions_closed: usize,
    /// Deliveries still queued at shutdown that were fanned out.
    pub deliveries_flushed: usize,
    /// Registrations still queued at shutdown that were refused.
    pub registrations_refused: usize,
}

enum Event {
    Shutdown,
    Deliver(Delivery),
    Register(SessionHandle),
    Unregister(SessionKey),
    Query(HubQuery),
}

/// The connection registry. Construct with [`Hub::new`], then drive it with
/// [`Hub::run`] on its own task.
pub struct Hub {
    live: LiveSet,
    register_rx: mpsc::UnboundedReceiver<SessionHandle>,
    unregister_rx: mpsc::UnboundedReceiver<SessionKey>,
    delivery_rx: mpsc::Receiver<Delivery>,
    query_rx: mpsc::UnboundedReceiver<HubQuery>,
    stop: CancellationToken,
    metrics: Arc<HubMetrics>,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("sessions", &self.live.len())
            .finish()
    }
}

impl Hub {
    /// Create a hub and the handle used to reach it.
    pub fn new(config: &RealtimeConfig) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::channel(config.delivery_intake_capacity.max(1));
        let (query_tx, query_rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let metrics = Arc::new(HubMetrics::new());

        let handle = HubHandle::new(
            register_tx,
            unregister_tx,
            delivery_tx,
            query_tx,
            stop.clone(),
            metrics.clone(),
        );

        let hub = Self {
            live: LiveSet::new(),
            register_rx,
            unregister_rx,
            delivery_rx,
            query_rx,
            stop,
            metrics,
        };

        (hub, handle)
    }

    /// Serve intakes until `shutdown` flips to `true` (or its sender is
    /// dropped), [`HubHandle::shutdown`] is called, or every handle is gone.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> HubSummary {
        info!("Hub control loop started");

        if *shutdown.borrow_and_update() {
            return self.shut_down();
        }

        loop {
            let event = tokio::select! {
                biased;

                _ = self.stop.cancelled() => Event::Shutdown,

                changed = shutdown.changed() => match changed {
                    Ok(()) if !*shutdown.borrow_and_update() => continue,
                    _ => Event::Shutdown,
                },

                event = next_request(
                    &mut self.delivery_rx,
                    &mut self.register_rx,
                    &mut self.unregister_rx,
                    &mut self.query_rx,
                ) => event,
            };

            match event {
                Event::Shutdown => break,
                Event::Deliver(delivery) => self.deliver(delivery),
                Event::Register(handle) => self.register(handle),
                Event::Unregister(key) => self.unregister(key),
                Event::Query(query) => {
                    self.catch_up();
                    self.answer(query);
                }
            }
        }

        self.shut_down()
    }

    fn register(&mut self, handle: SessionHandle) {
        let id = handle.id();

        if self.live.contains(&id) {
            self.metrics.record_duplicate();
            warn!(
                session_id = %id,
                owner_id = %handle.owner(),
                "Duplicate session ID, registration rejected"
            );
            handle.lifecycle().advance(SessionState::Closing);
            return;
        }

        // The session may already have failed and queued its unregister.
        if !handle.lifecycle().activate() {
            self.metrics.record_stale();
            debug!(session_id = %id, "Session closed before registration, skipped");
            return;
        }

        let owner = handle.owner().clone();
        if let Insert::Inserted = self.live.insert(handle) {
            self.metrics.record_registered();
            debug!(
                session_id = %id,
                owner_id = %owner,
                sessions = self.live.len(),
                "Session registered"
            );
        }
    }

    fn unregister(&mut self, key: SessionKey) {
        match self.live.remove(&key) {
            Remove::Removed(handle) => {
                handle.lifecycle().advance(SessionState::Closing);
                self.metrics.record_unregistered();
                debug!(
                    session_id = %key.id,
                    owner_id = %handle.owner(),
                    sessions = self.live.len(),
                    "Session unregistered"
                );
            }
            Remove::Unknown => {
                self.metrics.record_unknown_unregister();
                debug!(session_id = %key.id, "Unregister for unknown session ignored");
            }
        }
    }

    fn deliver(&mut self, delivery: Delivery) {
        let fan_out = self.live.deliver(&delivery.target, &delivery.payload);
        self.metrics.record_fan_out(fan_out.queued, fan_out.dropped);

        if fan_out.dropped > 0 {
            debug!(
                target = ?delivery.target,
                dropped = fan_out.dropped,
                "Mailbox full, payload dropped"
            );
        }

        for key in fan_out.closed {
            if let Remove::Removed(handle) = self.live.remove(&key) {
                handle.lifecycle().advance(SessionState::Closing);
                self.metrics.record_evicted();
                warn!(
                    session_id = %key.id,
                    owner_id = %handle.owner(),
                    "Session mailbox closed, evicted"
                );
            }
        }
    }

    /// Apply what was already waiting on the data intakes when called.
    ///
    /// Each intake is drained up to its length at entry, so senders that
    /// keep pushing cannot hold a query back indefinitely.
    fn catch_up(&mut self) {
        let registers = self.register_rx.len();
        let unregisters = self.unregister_rx.len();
        let deliveries = self.delivery_rx.len();

        for _ in 0..registers {
            match self.register_rx.try_recv() {
                Ok(handle) => self.register(handle),
                Err(_) => break,
            }
        }
        for _ in 0..unregisters {
            match self.unregister_rx.try_recv() {
                Ok(key) => self.unregister(key),
                Err(_) => break,
            }
        }
        for _ in 0..deliveries {
            match self.delivery_rx.try_recv() {
                Ok(delivery) => self.deliver(delivery),
                Err(_) => break,
            }
        }
    }

    fn answer(&self, query: HubQuery) {
        // A dropped reply receiver means the caller gave up waiting.
        match query {
            HubQuery::Stats(reply) => {
                let _ = reply.send(HubStats {
                    sessions: self.live.len(),
                    owners: self.live.owner_count(),
                });
            }
            HubQuery::Sessions(reply) => {
                let _ = reply.send(self.live.infos());
            }
            HubQuery::IsLive(id, reply) => {
                let _ = reply.send(self.live.contains(&id));
            }
        }
    }

    fn shut_down(mut self) -> HubSummary {
        self.stop.cancel();
        self.register_rx.close();
        self.delivery_rx.close();
        self.query_rx.close();

        let mut summary = HubSummary::default();

        while let Ok(delivery) = self.delivery_rx.try_recv() {
            self.deliver(delivery);
            summary.deliveries_flushed += 1;
        }

        while let Ok(handle) = self.register_rx.try_recv() {
            handle.lifecycle().advance(SessionState::Closing);
            summary.registrations_refused += 1;
        }

        let sessions = self.live.drain();
        summary.sessions_closed = sessions.len();
        self.metrics.record_drained(sessions.len() as u64);
        for handle in sessions {
            handle.lifecycle().advance(SessionState::Closing);
        }

        info!(
            sessions_closed = summary.sessions_closed,
            deliveries_flushed = summary.deliveries_flushed,
            registrations_refused = summary.registrations_refused,
            "Hub control loop stopped"
        );

        summary
    }
}

/// Waits on the data intakes with no fixed priority between them.
async fn next_request(
    delivery_rx: &mut mpsc::Receiver<Delivery>,
    register_rx: &mut mpsc::UnboundedReceiver<SessionHandle>,
    unregister_rx: &mut mpsc::UnboundedReceiver<SessionKey>,
    query_rx: &mut mpsc::UnboundedReceiver<HubQuery>,
) -> Event {
    tokio::select! {
        Some(delivery) = delivery_rx.recv() => Event::Deliver(delivery),

        // Every sender lives in `HubHandle`, so a closed register intake
        // means no handle is left.
        handle = register_rx.recv() => match handle {
            Some(handle) => Event::Register(handle),
            None => Event::Shutdown,
        },

        Some(key) = unregister_rx.recv() => Event::Unregister(key),

        Some(query) = query_rx.recv() => Event::Query(query),
    }
}
