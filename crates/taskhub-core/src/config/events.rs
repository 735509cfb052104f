//! Upstream event ingress configuration.

use serde::{Deserialize, Serialize};

/// In-process event bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Whether `POST /events` is mounted. Off unless configured, since any
    /// holder of a valid access token can publish through it.
    #[serde(default)]
    pub ingress_enabled: bool,
    /// Events buffered per bus subscriber before the slowest one lags.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            ingress_enabled: false,
            bus_capacity: default_bus_capacity(),
        }
    }
}

fn default_bus_capacity() -> usize {
    1024
}
