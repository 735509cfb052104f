//! Cloneable handle for submitting requests to the hub.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use taskhub_core::types::{OwnerId, SessionId};

use crate::message::{Delivery, Payload};
use crate::metrics::HubMetrics;
use crate::session::handle::{SessionHandle, SessionInfo, SessionKey};

use super::control::{HubQuery, HubStats};
use super::error::HubError;

/// Entry point for everything outside the control loop.
///
/// Registration and unregistration never wait. Deliveries wait only for room
/// in the delivery intake, never for a session's mailbox.
#[derive(Debug, Clone)]
pub struct HubHandle {
    register_tx: mpsc::UnboundedSender<SessionHandle>,
    unregister_tx: mpsc::UnboundedSender<SessionKey>,
    delivery_tx: mpsc::Sender<Delivery>,
    query_tx: mpsc::UnboundedSender<HubQuery>,
    stop: CancellationToken,
    metrics: Arc<HubMetrics>,
}

impl HubHandle {
    pub(super) fn new(
        register_tx: mpsc::UnboundedSender<SessionHandle>,
        unregister_tx: mpsc::UnboundedSender<SessionKey>,
        delivery_tx: mpsc::Sender<Delivery>,
        query_tx: mpsc::UnboundedSender<HubQuery>,
        stop: CancellationToken,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            register_tx,
            unregister_tx,
            delivery_tx,
            query_tx,
            stop,
            metrics,
        }
    }

    /// Submit a session for registration.
    ///
    /// `Ok` means the request is queued, not that the session is live; it
    /// becomes visible to deliveries once the control loop processes it.
    pub fn register(&self, session: SessionHandle) -> Result<(), HubError> {
        self.register_tx.send(session).map_err(|_| HubError::Closed)
    }

    /// Submit a removal. Unknown and already-removed keys are no-ops.
    pub fn unregister(&self, key: SessionKey) -> Result<(), HubError> {
        self.unregister_tx.send(key).map_err(|_| HubError::Closed)
    }

    /// Queue a delivery, waiting for room in the delivery intake.
    pub async fn deliver(&self, delivery: Delivery) -> Result<(), HubError> {
        self.delivery_tx
            .send(delivery)
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Queue a delivery without waiting.
    pub fn try_deliver(&self, delivery: Delivery) -> Result<(), HubError> {
        self.delivery_tx.try_send(delivery).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::Saturated,
            mpsc::error::TrySendError::Closed(_) => HubError::Closed,
        })
    }

    /// Deliver to every live session.
    pub async fn broadcast(&self, payload: impl Into<Payload>) -> Result<(), HubError> {
        self.deliver(Delivery::broadcast(payload)).await
    }

    /// Deliver to one session.
    pub async fn send_to(
        &self,
        session_id: SessionId,
        payload: impl Into<Payload>,
    ) -> Result<(), HubError> {
        self.deliver(Delivery::to_session(session_id, payload)).await
    }

    /// Deliver to every session of one owner.
    pub async fn send_to_owner(
        &self,
        owner: impl Into<OwnerId>,
        payload: impl Into<Payload>,
    ) -> Result<(), HubError> {
        self.deliver(Delivery::to_owner(owner, payload)).await
    }

    /// Live session and owner counts.
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        self.query(HubQuery::Stats).await
    }

    /// Snapshot of every live session.
    pub async fn sessions(&self) -> Result<Vec<SessionInfo>, HubError> {
        self.query(HubQuery::Sessions).await
    }

    /// Whether `session_id` is in the live set.
    pub async fn is_live(&self, session_id: SessionId) -> Result<bool, HubError> {
        self.query(|reply| HubQuery::IsLive(session_id, reply)).await
    }

    async fn query<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> HubQuery,
    ) -> Result<T, HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.query_tx
            .send(build(reply_tx))
            .map_err(|_| HubError::Closed)?;
        reply_rx.await.map_err(|_| HubError::Closed)
    }

    /// Ask the control loop to run its shutdown handshake.
    pub fn shutdown(&self) {
        self.stop.cancel();
    }

    /// Whether shutdown has been requested or the hub is gone.
    pub fn is_closed(&self) -> bool {
        self.stop.is_cancelled() || self.register_tx.is_closed()
    }

    /// Shared hub counters.
    pub fn metrics(&self) -> &Arc<HubMetrics> {
        &self.metrics
    }
}
