//! Realtime hub configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Realtime hub and client session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound mailbox slots per session.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Pending deliveries the control loop will buffer before `broadcast` waits.
    #[serde(default = "default_delivery_intake")]
    pub delivery_intake_capacity: usize,
    /// Interval between liveness probes, in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Read deadline, reset on every inbound frame, in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,
    /// Write deadline for a single outbound frame, in seconds.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_seconds: u64,
    /// Largest inbound frame accepted from a client, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            delivery_intake_capacity: default_delivery_intake(),
            ping_interval_seconds: default_ping_interval(),
            read_timeout_seconds: default_read_timeout(),
            write_timeout_seconds: default_write_timeout(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl RealtimeConfig {
    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Read deadline as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }

    /// Write deadline as a [`Duration`].
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }

    /// Checks the settings for values the hub cannot run with.
    ///
    /// The probe must go out before the read deadline expires, otherwise an
    /// idle but healthy client is evicted on every cycle.
    pub fn validate(&self) -> Result<(), String> {
        if self.mailbox_capacity == 0 {
            return Err("realtime.mailbox_capacity must be greater than zero".to_string());
        }
        if self.delivery_intake_capacity == 0 {
            return Err("realtime.delivery_intake_capacity must be greater than zero".to_string());
        }
        if self.write_timeout_seconds == 0 || self.read_timeout_seconds == 0 {
            return Err("realtime read/write timeouts must be greater than zero".to_string());
        }
        if self.ping_interval_seconds == 0
            || self.ping_interval_seconds >= self.read_timeout_seconds
        {
            return Err(format!(
                "realtime.ping_interval_seconds ({}) must be between 1 and read_timeout_seconds ({})",
                self.ping_interval_seconds, self.read_timeout_seconds
            ));
        }
        Ok(())
    }
}

fn default_mailbox_capacity() -> usize {
    256
}

fn default_delivery_intake() -> usize {
    1024
}

fn default_ping_interval() -> u64 {
    54
}

fn default_read_timeout() -> u64 {
    60
}

fn default_write_timeout() -> u64 {
    10
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}
