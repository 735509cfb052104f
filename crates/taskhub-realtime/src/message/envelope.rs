//! JSON envelope wrapping upstream events on their way to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskhub_core::types::{EventId, OwnerId};

use crate::bridge::event::DomainEvent;

use super::payload::Payload;

/// Envelope written to clients for every forwarded domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Envelope discriminator, always `"event"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Upstream event ID, usable for client-side deduplication.
    pub event_id: EventId,
    /// Dotted event name, e.g. `task.task.created`.
    pub event_type: String,
    /// When the upstream service produced the event.
    pub timestamp: DateTime<Utc>,
    /// The user whose action produced the event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<OwnerId>,
    /// Event-specific fields, passed through untouched.
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl EventEnvelope {
    /// Wrap a domain event.
    pub fn from_event(event: &DomainEvent) -> Self {
        Self {
            kind: "event".to_string(),
            event_id: event.event_id,
            event_type: event.event_type.clone(),
            timestamp: event.timestamp,
            user_id: event.user_id.clone(),
            data: event.data.clone(),
        }
    }

    /// Serialize into a text payload.
    pub fn to_payload(&self) -> Result<Payload, serde_json::Error> {
        serde_json::to_string(self).map(Payload::from)
    }
}
