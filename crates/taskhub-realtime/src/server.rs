//! Top-level real-time engine that ties the hub, the event bus, and the
//! event bridge together.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{info, warn};

use taskhub_core::{AppError, AppResult};
use taskhub_core::config::{EventsConfig, RealtimeConfig};
use taskhub_core::types::OwnerId;

use crate::bridge::{EventBridge, MemoryEventBus};
use crate::heartbeat::SessionTimings;
use crate::hub::{Hub, HubHandle, HubSummary};
use crate::session::ClientSession;

/// Cloneable access to a running engine.
#[derive(Debug, Clone)]
pub struct RealtimeEngine {
    /// Hub handle.
    pub hub: HubHandle,
    /// In-process upstream event bus.
    pub bus: MemoryEventBus,
    /// Heartbeat timings for new sessions.
    pub timings: SessionTimings,
    mailbox_capacity: usize,
}

/// Background tasks of a running engine.
#[derive(Debug)]
pub struct EngineTasks {
    hub: JoinHandle<HubSummary>,
    bridge: JoinHandle<u64>,
}

impl RealtimeEngine {
    /// Spawn the hub control loop and the event bridge. Both stop when
    /// `shutdown` flips to `true`.
    pub fn start(
        realtime: &RealtimeConfig,
        events: &EventsConfig,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, EngineTasks) {
        let (hub, handle) = Hub::new(realtime);
        let bus = MemoryEventBus::new(events.bus_capacity);

        let bridge = EventBridge::new(handle.clone());
        let bridge_task = tokio::spawn(bridge.run(bus.subscribe(), shutdown.clone()));
        let hub_task = tokio::spawn(hub.run(shutdown));

        info!(
            mailbox_capacity = realtime.mailbox_capacity,
            ping_interval_seconds = realtime.ping_interval_seconds,
            read_timeout_seconds = realtime.read_timeout_seconds,
            "Real-time engine started"
        );

        let engine = Self {
            hub: handle,
            bus,
            timings: SessionTimings::from_config(realtime),
            mailbox_capacity: realtime.mailbox_capacity,
        };
        let tasks = EngineTasks {
            hub: hub_task,
            bridge: bridge_task,
        };

        (engine, tasks)
    }

    /// A new, unregistered session for `owner`.
    pub fn new_session(&self, owner: impl Into<OwnerId>) -> ClientSession {
        ClientSession::new(owner, self.timings, self.mailbox_capacity)
    }
}

impl EngineTasks {
    /// Wait for the hub to finish its shutdown handshake, up to `grace`.
    pub async fn join(self, grace: Duration) -> AppResult<HubSummary> {
        let summary = match time::timeout(grace, self.hub).await {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => return Err(AppError::internal(format!("Hub task failed: {e}"))),
            Err(_) => {
                return Err(AppError::service_unavailable(format!(
                    "Hub did not stop within {grace:?}"
                )));
            }
        };

        if time::timeout(grace, self.bridge).await.is_err() {
            warn!("Event bridge did not stop within grace period");
        }

        info!(
            sessions_closed = summary.sessions_closed,
            "Real-time engine shut down"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::DomainEvent;
    use crate::session::transport::mock;
    use crate::session::Frame;

    #[tokio::test]
    async fn test_engine_forwards_bus_events_to_sessions() {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (engine, tasks) =
            RealtimeEngine::start(&RealtimeConfig::default(), &EventsConfig::default(), shutdown_rx);

        let session = engine.new_session("u1");
        let id = session.id();
        let (sink, stream, mut peer) = mock::connection();
        tokio::spawn(session.run(engine.hub.clone(), sink, stream));
        while !engine.hub.is_live(id).await.unwrap() {
            tokio::task::yield_now().await;
        }

        engine
            .bus
            .publish(DomainEvent::new("task.task.completed", Some(OwnerId::from("u1"))));

        let Some(Frame::Text(text)) = peer.next_frame().await else {
            panic!("expected a text frame");
        };
        let envelope: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(envelope["event_type"], "task.task.completed");

        shutdown.send(true).unwrap();
        let summary = tasks.join(Duration::from_secs(5)).await.unwrap();
        assert_eq!(summary.sessions_closed, 1);
        assert_eq!(peer.next_frame().await, Some(Frame::Close));
    }
}
