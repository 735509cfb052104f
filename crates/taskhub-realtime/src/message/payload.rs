//! Outbound payloads and their addressing.

use bytes::Bytes;

use taskhub_core::types::{OwnerId, SessionId};

use crate::session::transport::Frame;

use super::text::SharedText;

/// An opaque outbound payload.
///
/// Cloning is cheap: fan-out to many sessions shares one allocation, all the
/// way to the frame each outbound pump writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 payload, written as a text frame.
    Text(SharedText),
    /// Arbitrary bytes, written as a binary frame.
    Binary(Bytes),
}

impl Payload {
    /// Build a text payload.
    pub fn text(text: impl Into<SharedText>) -> Self {
        Self::Text(text.into())
    }

    /// Build a binary payload.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::Binary(data.into())
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Whether the payload carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into the wire frame the outbound pump writes.
    pub fn into_frame(self) -> Frame {
        match self {
            Self::Text(text) => Frame::Text(text),
            Self::Binary(data) => Frame::Binary(data),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Self::Binary(data)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(data))
    }
}

/// Who a payload is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every live session.
    All,
    /// One session.
    Session(SessionId),
    /// Every live session of one owner.
    Owner(OwnerId),
}

/// A payload plus its addressing, as submitted to the hub.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Recipients.
    pub target: Target,
    /// Payload, never inspected by the hub.
    pub payload: Payload,
}

impl Delivery {
    /// Address a payload to every live session.
    pub fn broadcast(payload: impl Into<Payload>) -> Self {
        Self {
            target: Target::All,
            payload: payload.into(),
        }
    }

    /// Address a payload to one session.
    pub fn to_session(session_id: SessionId, payload: impl Into<Payload>) -> Self {
        Self {
            target: Target::Session(session_id),
            payload: payload.into(),
        }
    }

    /// Address a payload to all sessions of an owner.
    pub fn to_owner(owner: impl Into<OwnerId>, payload: impl Into<Payload>) -> Self {
        Self {
            target: Target::Owner(owner.into()),
            payload: payload.into(),
        }
    }
}
