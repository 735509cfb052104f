//! Domain event → hub delivery.
//!
//! Wraps each upstream event in an [`EventEnvelope`] and hands it to the hub
//! addressed by [`DomainEvent::route`].

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::hub::{HubError, HubHandle};
use crate::message::EventEnvelope;

use super::event::{DomainEvent, Route};
use super::source::EventSource;

/// Bridges upstream events into the hub.
#[derive(Debug, Clone)]
pub struct EventBridge {
    hub: HubHandle,
}

impl EventBridge {
    /// Create a new event bridge
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }

    /// Submit one event. Returns the number of deliveries queued.
    pub async fn forward(&self, event: &DomainEvent) -> Result<usize, HubError> {
        let route = event.route();
        if route == Route::Nowhere {
            debug!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                "Event has no recipients"
            );
            return Ok(0);
        }

        let payload = match EventEnvelope::from_event(event).to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!(event_id = %event.event_id, error = %e, "Failed to encode event");
                return Ok(0);
            }
        };

        let queued = match route {
            Route::Everyone => {
                self.hub.broadcast(payload).await?;
                1
            }
            Route::Owners(owners) => {
                for owner in &owners {
                    self.hub.send_to_owner(owner.clone(), payload.clone()).await?;
                }
                owners.len()
            }
            Route::Nowhere => 0,
        };

        debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            deliveries = queued,
            "Event forwarded"
        );

        Ok(queued)
    }

    /// Forward events from `source` until it ends, the hub closes, or
    /// `shutdown` fires. Returns the number of events forwarded.
    pub async fn run<S: EventSource>(self, mut source: S, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!("Event bridge started");
        let mut forwarded = 0u64;

        loop {
            let event = tokio::select! {
                biased;

                changed = shutdown.changed() => match changed {
                    Ok(()) if !*shutdown.borrow_and_update() => continue,
                    _ => break,
                },

                event = source.next_event() => match event {
                    Some(event) => event,
                    None => {
                        warn!("Event source ended");
                        break;
                    }
                },
            };

            match self.forward(&event).await {
                Ok(_) => forwarded += 1,
                Err(e) => {
                    warn!(error = %e, "Hub unavailable, event bridge stopping");
                    break;
                }
            }
        }

        info!(forwarded, "Event bridge stopped");
        forwarded
    }
}
