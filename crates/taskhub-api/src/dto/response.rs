//! Response DTOs.

use serde::{Deserialize, Serialize};

use taskhub_core::types::EventId;
use taskhub_realtime::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// Overall status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
    /// Live sessions, as seen by the hub.
    pub sessions: usize,
    /// Distinct owners with a live session.
    pub owners: usize,
    /// Hub counters.
    pub metrics: MetricsSnapshot,
}

/// Reply to an accepted upstream event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAccepted {
    /// ID of the published event.
    pub event_id: EventId,
    /// Bus subscribers that will see it.
    pub subscribers: usize,
}
