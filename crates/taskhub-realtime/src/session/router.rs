//! Hand-off point for data frames received from clients.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::message::SharedText;

use super::handle::SessionInfo;

/// Data received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    /// Text frame contents.
    Text(SharedText),
    /// Binary frame contents.
    Binary(Bytes),
}

impl InboundPayload {
    /// Size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receives client data frames. The hub itself never looks at them.
///
/// Called from the session's inbound pump, so a slow router delays that
/// session's reads (and its read deadline) but nothing else.
#[async_trait]
pub trait InboundRouter: Send + Sync + 'static {
    /// Handle one data frame from `session`.
    async fn route(&self, session: &SessionInfo, payload: InboundPayload);
}

/// Router that only logs what it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRouter;

#[async_trait]
impl InboundRouter for LoggingRouter {
    async fn route(&self, session: &SessionInfo, payload: InboundPayload) {
        match &payload {
            InboundPayload::Text(text) => debug!(
                session_id = %session.id,
                owner_id = %session.owner,
                message = %text,
                "Received message"
            ),
            InboundPayload::Binary(data) => debug!(
                session_id = %session.id,
                owner_id = %session.owner,
                bytes = data.len(),
                "Received binary message"
            ),
        }
    }
}
