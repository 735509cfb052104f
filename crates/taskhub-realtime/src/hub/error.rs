//! Hub submission errors.

use taskhub_core::AppError;

/// Why a request could not be submitted to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub has shut down.
    #[error("hub is shut down")]
    Closed,
    /// The delivery intake is full (non-waiting submission only).
    #[error("hub delivery intake is full")]
    Saturated,
}

impl From<HubError> for AppError {
    fn from(err: HubError) -> Self {
        AppError::service_unavailable(err.to_string())
    }
}
