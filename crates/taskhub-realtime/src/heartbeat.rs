//! Ping/pong liveness timings for client sessions.
//!
//! The outbound pump sends a ping every `ping_interval`; the inbound pump
//! gives up when nothing at all (data, pong, or close) arrives within
//! `read_timeout`. With the interval shorter than the deadline, a client
//! that answers pings stays connected indefinitely while a silent one is
//! evicted roughly one read deadline after its last frame.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use taskhub_core::config::RealtimeConfig;

/// Per-session deadline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Maximum silence from the client before the session is dropped.
    pub read_timeout: Duration,
    /// Maximum time a single outbound write may take.
    pub write_timeout: Duration,
}

impl SessionTimings {
    /// Build timings from the realtime configuration section.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }

    /// Ticker for the outbound pump. The first tick fires one full interval
    /// after creation, and a stalled pump does not burst missed pings.
    pub fn ping_ticker(&self) -> Interval {
        let mut ticker = time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}
