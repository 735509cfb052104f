//! Upstream domain events and who should see them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use taskhub_core::types::{EventId, OwnerId};

/// Prefix of events addressed to every connected client.
pub const SYSTEM_EVENT_PREFIX: &str = "system.";

/// An event published by one of the CRUD services.
///
/// The common fields are typed; everything else (`task_id`, `changes`,
/// `shared_with`, ...) is kept as JSON and forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Event ID, generated when absent.
    #[serde(default)]
    pub event_id: EventId,
    /// Dotted name: `<service>.<entity>.<action>`.
    pub event_type: String,
    /// Production time, defaults to receipt time.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Acting user.
    #[serde(default)]
    pub user_id: Option<OwnerId>,
    /// Type-specific fields.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Recipients of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Every live session.
    Everyone,
    /// Every session of each listed owner.
    Owners(Vec<OwnerId>),
    /// No one.
    Nowhere,
}

impl DomainEvent {
    /// Build an event stamped now, with a fresh ID.
    pub fn new(event_type: impl Into<String>, user_id: Option<OwnerId>) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            user_id,
            data: Map::new(),
        }
    }

    /// Attach a type-specific field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// The user this event was shared with, for share events.
    pub fn shared_with(&self) -> Option<OwnerId> {
        self.data
            .get("shared_with")
            .and_then(Value::as_str)
            .map(OwnerId::from)
    }

    /// Resolve recipients: `system.*` goes to everyone; otherwise the acting
    /// user and, for shares, the recipient.
    pub fn route(&self) -> Route {
        if self.event_type.starts_with(SYSTEM_EVENT_PREFIX) {
            return Route::Everyone;
        }

        let mut owners: Vec<OwnerId> = self.user_id.iter().cloned().collect();
        if let Some(recipient) = self.shared_with() {
            if !owners.contains(&recipient) {
                owners.push(recipient);
            }
        }

        if owners.is_empty() {
            Route::Nowhere
        } else {
            Route::Owners(owners)
        }
    }
}
