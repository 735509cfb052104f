//! Upstream event ingress.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use taskhub_core::AppError;
use taskhub_realtime::{DomainEvent, HubError};

use crate::auth::{AuthError, bearer_token};
use crate::dto::response::{ApiResponse, EventAccepted};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /events: publish a domain event onto the in-process bus.
///
/// Callers must present a bearer token signed with the gateway secret.
/// Anonymous access never applies here. The token is checked before the
/// body, so an unauthenticated caller always gets 401.
pub async fn publish_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DomainEvent>, JsonRejection>,
) -> Response {
    match accept(&state, &headers, body) {
        Ok(accepted) => (StatusCode::ACCEPTED, Json(ApiResponse::ok(accepted))).into_response(),
        Err(e) => e.into_response(),
    }
}

fn accept(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Json<DomainEvent>, JsonRejection>,
) -> Result<EventAccepted, ApiError> {
    let publisher = bearer_token(headers)
        .ok_or(AuthError::MissingToken)
        .and_then(|token| state.verifier.verify(token))
        .inspect_err(|e| warn!(error = %e, "Event publish rejected"))?;

    if state.realtime.hub.is_closed() {
        return Err(HubError::Closed.into());
    }

    let Json(event) = body.map_err(|e| AppError::validation(e.body_text()))?;
    if event.event_type.trim().is_empty() {
        return Err(AppError::validation("event_type must not be empty").into());
    }

    let event_id = event.event_id;
    debug!(
        event_id = %event_id,
        event_type = %event.event_type,
        publisher = %publisher.owner_id,
        "Event received"
    );
    let subscribers = state.realtime.bus.publish(event);

    Ok(EventAccepted {
        event_id,
        subscribers,
    })
}
