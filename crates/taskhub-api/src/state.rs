//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use taskhub_core::config::AppConfig;
use taskhub_realtime::RealtimeEngine;

use crate::auth::JwtVerifier;

/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Running realtime engine
    pub realtime: RealtimeEngine,
    /// Access-token verifier
    pub verifier: Arc<JwtVerifier>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Build state around a started engine.
    pub fn new(config: Arc<AppConfig>, realtime: RealtimeEngine) -> Self {
        let verifier = Arc::new(JwtVerifier::new(&config.auth));
        Self {
            config,
            realtime,
            verifier,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was built.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
