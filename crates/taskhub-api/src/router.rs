//! Route definitions for the gateway's HTTP surface.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Build the router with every route, threading `AppState` through.
///
/// `POST /events` is only mounted when event ingress is enabled.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/ws", get(handlers::ws::ws_upgrade))
        .merge(health_routes());

    if state.config.events.ingress_enabled {
        router = router.route("/events", post(handlers::events::publish_event));
    }

    router.with_state(state)
}

/// Health endpoints: liveness and hub statistics
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use tokio::sync::watch;
    use tower::ServiceExt;

    use taskhub_core::config::AppConfig;
    use taskhub_core::types::{OwnerId, SessionId};
    use taskhub_realtime::session::SessionHandle;
    use taskhub_realtime::{Payload, RealtimeEngine};

    use super::*;
    use crate::auth::Claims;

    struct TestApp {
        router: Router,
        engine: RealtimeEngine,
        _shutdown: watch::Sender<bool>,
    }

    fn app_with(config: AppConfig) -> TestApp {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (engine, _tasks) =
            RealtimeEngine::start(&config.realtime, &config.events, shutdown_rx);
        let state = AppState::new(Arc::new(config), engine.clone());
        TestApp {
            router: build_router(state),
            engine,
            _shutdown: shutdown,
        }
    }

    fn app() -> TestApp {
        let mut config = AppConfig::default();
        config.events.ingress_enabled = true;
        app_with(config)
    }

    fn post_event(event: Value, token: Option<&str>) -> Request<Body> {
        let mut request = Request::post("/events").header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        request.body(Body::from(event.to_string())).unwrap()
    }

    fn token(exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: "u1".to_string(),
            email: String::new(),
            exp: now + exp_offset,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(AppConfig::default().auth.jwt_secret.as_bytes()),
        )
        .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let app = app();
        let response = app
            .router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_ws_without_token_is_unauthorized() {
        let app = app();
        let response = app
            .router
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_ws_with_expired_token_is_unauthorized() {
        let app = app();
        let uri = format!("/ws?token={}", token(-3600));
        let response = app
            .router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Token has expired");
    }

    #[tokio::test]
    async fn test_ws_with_valid_token_but_no_upgrade_headers_is_rejected() {
        let app = app();
        let response = app
            .router
            .oneshot(
                Request::get("/ws")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token(900)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_posted_event_reaches_owner_mailbox() {
        let app = app();
        let (handle, mut mailbox, _lifecycle) =
            SessionHandle::new(SessionId::new(), OwnerId::from("u1"), 8);
        app.engine.hub.register(handle).unwrap();
        app.engine.hub.stats().await.unwrap();

        let event = json!({
            "event_type": "task.task.updated",
            "user_id": "u1",
            "task_id": "t-9",
        });
        let response = app
            .router
            .oneshot(post_event(event, Some(&token(900))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let Some(Payload::Text(text)) = mailbox.recv().await else {
            panic!("expected a text payload");
        };
        let envelope: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(envelope["type"], "event");
        assert_eq!(envelope["event_type"], "task.task.updated");
        assert_eq!(envelope["data"]["task_id"], "t-9");
    }

    #[tokio::test]
    async fn test_empty_event_type_is_a_validation_error() {
        let app = app();
        let response = app
            .router
            .oneshot(post_event(json!({ "event_type": " " }), Some(&token(900))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_event_without_token_is_unauthorized_and_not_published() {
        let app = app();
        let (handle, mut mailbox, _lifecycle) =
            SessionHandle::new(SessionId::new(), OwnerId::from("u1"), 8);
        app.engine.hub.register(handle).unwrap();
        app.engine.hub.stats().await.unwrap();

        let rejected = json!({ "event_type": "task.task.deleted", "user_id": "u1" });
        let response = app
            .router
            .clone()
            .oneshot(post_event(rejected, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "UNAUTHORIZED");

        let marker = json!({ "event_type": "task.task.created", "user_id": "u1" });
        let response = app
            .router
            .oneshot(post_event(marker, Some(&token(900))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        // The first payload is the authenticated event.
        let Some(Payload::Text(text)) = mailbox.recv().await else {
            panic!("expected a text payload");
        };
        let envelope: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(envelope["event_type"], "task.task.created");
    }

    #[tokio::test]
    async fn test_event_with_forged_token_is_unauthorized() {
        let app = app();
        let forged = encode(
            &Header::default(),
            &Claims {
                user_id: "u1".to_string(),
                email: String::new(),
                exp: Utc::now().timestamp() + 900,
                iat: Utc::now().timestamp(),
            },
            &EncodingKey::from_secret(b"not-the-gateway-secret"),
        )
        .unwrap();

        let response = app
            .router
            .oneshot(post_event(json!({ "event_type": "x.y.z" }), Some(&forged)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_event_ingress_ignores_anonymous_access() {
        let mut config = AppConfig::default();
        config.events.ingress_enabled = true;
        config.auth.allow_anonymous = true;
        let app = app_with(config);

        let response = app
            .router
            .oneshot(post_event(json!({ "event_type": "x.y.z" }), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_event_ingress_is_off_by_default() {
        let app = app_with(AppConfig::default());

        let response = app
            .router
            .oneshot(post_event(json!({ "event_type": "x.y.z" }), Some(&token(900))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_event_ingress_can_be_disabled() {
        let mut config = AppConfig::default();
        config.events.ingress_enabled = false;
        let app = app_with(config);

        let response = app
            .router
            .oneshot(post_event(json!({ "event_type": "x.y.z" }), Some(&token(900))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_detailed_health_counts_sessions() {
        let app = app();
        let (handle, _mailbox, _lifecycle) =
            SessionHandle::new(SessionId::new(), OwnerId::from("u1"), 8);
        app.engine.hub.register(handle).unwrap();

        let response = app
            .router
            .oneshot(Request::get("/health/detailed").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["sessions"], 1);
        assert_eq!(body["data"]["owners"], 1);
        assert_eq!(body["data"]["metrics"]["sessions_registered"], 1);
    }

    #[tokio::test]
    async fn test_detailed_health_after_shutdown_is_unavailable() {
        let app = app();
        app.engine.hub.shutdown();

        let response = app
            .router
            .oneshot(Request::get("/health/detailed").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
