//! WebSocket upgrade handler and the axum transport adapter.

use std::future::ready;

use axum::body::Bytes;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use taskhub_realtime::{Frame, HubError, SharedText, TransportError};

use crate::auth::{Identity, authenticate};
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token, for clients that cannot set headers.
    pub token: Option<String>,
}

/// GET /ws: authenticate, then upgrade.
///
/// Identity is resolved before the upgrade extractor is looked at, so a
/// request without credentials gets 401 regardless of its headers.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let identity = match authenticate(
        &state.verifier,
        state.config.auth.allow_anonymous,
        &headers,
        query.token.as_deref(),
    ) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "WebSocket upgrade rejected");
            return ApiError::from(e).into_response();
        }
    };

    if state.realtime.hub.is_closed() {
        return ApiError::from(HubError::Closed).into_response();
    }

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let max_frame = state.config.realtime.max_frame_bytes;
    upgrade
        .max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| serve_socket(state, identity, socket))
}

/// Runs one accepted connection as a hub session until it ends.
async fn serve_socket(state: AppState, identity: Identity, socket: WebSocket) {
    let (ws_tx, ws_rx) = socket.split();

    let sink = ws_tx
        .sink_map_err(TransportError::io)
        .with(|frame: Frame| ready(into_message(frame)));
    let stream = ws_rx.filter_map(|msg| {
        ready(match msg {
            Ok(msg) => Some(Ok(from_message(msg))),
            Err(e) => Some(Err(TransportError::io(e))),
        })
    });

    let session = state.realtime.new_session(identity.owner_id.clone());
    info!(
        session_id = %session.id(),
        owner_id = %identity.owner_id,
        "WebSocket connection established"
    );

    let report = session
        .run(state.realtime.hub.clone(), sink, stream)
        .await;

    info!(
        session_id = %report.id,
        owner_id = %identity.owner_id,
        reason = %report.reason,
        frames_sent = report.frames_sent,
        frames_received = report.frames_received,
        "WebSocket connection closed"
    );
}

/// Text frames hand their shared buffer to axum without copying it.
fn into_message(frame: Frame) -> Result<Message, TransportError> {
    Ok(match frame {
        Frame::Text(text) => {
            Message::Text(Utf8Bytes::try_from(text.into_bytes()).map_err(TransportError::io)?)
        }
        Frame::Binary(data) => Message::Binary(data),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close => Message::Close(None),
    })
}

fn from_message(msg: Message) -> Frame {
    match msg {
        Message::Text(text) => Frame::Text(text_frame(text)),
        Message::Binary(data) => Frame::Binary(data),
        Message::Ping(data) => Frame::Ping(data),
        Message::Pong(data) => Frame::Pong(data),
        Message::Close(_) => Frame::Close,
    }
}

fn text_frame(text: Utf8Bytes) -> SharedText {
    // Already checked as UTF-8 by axum, so this cannot fall back.
    SharedText::try_from(Bytes::from(text)).unwrap_or_default()
}
