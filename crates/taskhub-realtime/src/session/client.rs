//! Client session supervisor.
//!
//! Owns one physical connection for its whole life: registers with the hub,
//! runs both pumps as a task group, stops the survivor when either exits,
//! unregisters, and closes the connection exactly once.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use taskhub_core::types::{OwnerId, SessionId};

use crate::heartbeat::SessionTimings;
use crate::hub::HubHandle;
use crate::message::Payload;

use super::close::{CloseGuard, close_connection};
use super::handle::{SessionHandle, SessionInfo, SessionKey};
use super::lifecycle::{SessionLifecycle, SessionState};
use super::pumps::{ExitReason, InboundOutcome, OutboundOutcome, run_inbound, run_outbound};
use super::router::{InboundRouter, LoggingRouter};
use super::transport::{FrameSink, FrameStream};

/// Summary of a finished session.
#[derive(Debug)]
pub struct SessionReport {
    /// Session ID.
    pub id: SessionId,
    /// Why the first pump stopped.
    pub reason: ExitReason,
    /// Data frames written to the client.
    pub frames_sent: u64,
    /// Frames of any kind read from the client.
    pub frames_received: u64,
}

enum PumpExit<W> {
    Outbound(OutboundOutcome<W>),
    Inbound(InboundOutcome),
}

/// One accepted client connection, ready to run.
pub struct ClientSession {
    handle: SessionHandle,
    mailbox: mpsc::Receiver<Payload>,
    lifecycle: Arc<SessionLifecycle>,
    timings: SessionTimings,
    router: Arc<dyn InboundRouter>,
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("info", self.handle.info())
            .field("state", &self.lifecycle.state())
            .finish()
    }
}

impl ClientSession {
    /// Create a session with a fresh ID for `owner`.
    pub fn new(owner: impl Into<OwnerId>, timings: SessionTimings, mailbox_capacity: usize) -> Self {
        Self::with_id(SessionId::new(), owner, timings, mailbox_capacity)
    }

    /// Create a session with a caller-chosen ID. IDs must be unique.
    pub fn with_id(
        id: SessionId,
        owner: impl Into<OwnerId>,
        timings: SessionTimings,
        mailbox_capacity: usize,
    ) -> Self {
        let (handle, mailbox, lifecycle) = SessionHandle::new(id, owner.into(), mailbox_capacity);
        Self {
            handle,
            mailbox,
            lifecycle,
            timings,
            router: Arc::new(LoggingRouter),
        }
    }

    /// Route client data frames to `router` instead of the logging default.
    pub fn with_router(mut self, router: Arc<dyn InboundRouter>) -> Self {
        self.router = router;
        self
    }

    /// Session ID.
    pub fn id(&self) -> SessionId {
        self.handle.id()
    }

    /// Key to pass to [`HubHandle::unregister`] to evict this session.
    pub fn key(&self) -> SessionKey {
        self.handle.key()
    }

    /// Shared lifecycle state, observable after `run` consumes the session.
    pub fn lifecycle(&self) -> Arc<SessionLifecycle> {
        self.lifecycle.clone()
    }

    /// Run the session to completion over the given connection halves.
    pub async fn run<W, R>(self, hub: HubHandle, mut sink: W, stream: R) -> SessionReport
    where
        W: FrameSink,
        R: FrameStream,
    {
        let Self {
            handle,
            mailbox,
            lifecycle,
            timings,
            router,
        } = self;

        let info: SessionInfo = handle.info().clone();
        let key = handle.key();
        let guard = Arc::new(CloseGuard::new());

        if let Err(e) = hub.register(handle) {
            warn!(session_id = %info.id, error = %e, "Hub refused session");
            lifecycle.advance(SessionState::Closing);
            close_connection(&mut sink, &guard, timings.write_timeout).await;
            lifecycle.advance(SessionState::Closed);
            return SessionReport {
                id: info.id,
                reason: ExitReason::HubUnavailable,
                frames_sent: 0,
                frames_received: 0,
            };
        }

        debug!(session_id = %info.id, owner_id = %info.owner, "Session pumps starting");

        let stop = CancellationToken::new();
        let mut pumps = JoinSet::new();

        pumps.spawn({
            let guard = guard.clone();
            let stop = stop.clone();
            async move { PumpExit::Outbound(run_outbound(mailbox, sink, guard, timings, stop).await) }
        });
        pumps.spawn({
            let info = info.clone();
            let metrics = hub.metrics().clone();
            let stop = stop.clone();
            async move {
                PumpExit::Inbound(run_inbound(stream, info, router, timings, metrics, stop).await)
            }
        });

        let mut first_reason: Option<ExitReason> = None;
        let mut sink: Option<W> = None;
        let mut frames_sent = 0;
        let mut frames_received = 0;

        while let Some(joined) = pumps.join_next().await {
            let reason = match joined {
                Ok(PumpExit::Outbound(outcome)) => {
                    frames_sent = outcome.frames_sent;
                    sink = Some(outcome.sink);
                    outcome.reason
                }
                Ok(PumpExit::Inbound(outcome)) => {
                    frames_received = outcome.frames_received;
                    outcome.reason
                }
                Err(e) => {
                    error!(session_id = %info.id, error = %e, "Session pump panicked");
                    ExitReason::Panicked
                }
            };

            if first_reason.is_none() {
                lifecycle.advance(SessionState::Closing);
                stop.cancel();
                first_reason = Some(reason);
            }
        }

        if let Err(e) = hub.unregister(key) {
            debug!(session_id = %info.id, error = %e, "Unregister skipped");
        }

        if let Some(mut sink) = sink {
            close_connection(&mut sink, &guard, timings.write_timeout).await;
        }
        lifecycle.advance(SessionState::Closed);

        let reason = first_reason.unwrap_or(ExitReason::Stopped);
        info!(
            session_id = %info.id,
            owner_id = %info.owner,
            reason = %reason,
            frames_sent,
            frames_received,
            "Session closed"
        );

        SessionReport {
            id: info.id,
            reason,
            frames_sent,
            frames_received,
        }
    }
}
