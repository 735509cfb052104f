//! Integration tests for WebSocket connections and event delivery.

use std::time::Duration;

use axum::http::StatusCode;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use taskhub_core::types::OwnerId;
use taskhub_realtime::DomainEvent;

use crate::helpers::{TestApp, next_json, next_text};

#[tokio::test]
async fn test_ws_upgrade_without_token_is_rejected() {
    let app = TestApp::new().await;

    match app.connect_anonymous().await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("upgrade should be refused"),
    }
}

#[tokio::test]
async fn test_ws_upgrade_with_forged_token_is_rejected() {
    let app = TestApp::new().await;
    let mut config = app.config.clone();
    config.auth.jwt_secret = "someone-else".to_string();
    let forger = TestApp::with_config(config).await;

    match app.connect(&forger.token_for("u1")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("upgrade should be refused"),
    }
}

#[tokio::test]
async fn test_owner_addressed_event_reaches_only_owner() {
    let app = TestApp::new().await;
    let mut alice = app.connect(&app.token_for("alice")).await.unwrap();
    let mut bob = app.connect(&app.token_for("bob")).await.unwrap();
    app.wait_for_sessions(2).await;

    app.engine.bus.publish(
        DomainEvent::new("task.task.created", Some(OwnerId::from("alice")))
            .with_field("task_id", "t-1"),
    );
    app.engine
        .bus
        .publish(DomainEvent::new("system.maintenance", None));

    let first = next_json(&mut alice).await;
    assert_eq!(first["type"], "event");
    assert_eq!(first["event_type"], "task.task.created");
    assert_eq!(first["user_id"], "alice");
    assert_eq!(first["data"]["task_id"], "t-1");

    let second = next_json(&mut alice).await;
    assert_eq!(second["event_type"], "system.maintenance");

    // Bob only sees the system event.
    let only = next_json(&mut bob).await;
    assert_eq!(only["event_type"], "system.maintenance");
}

#[tokio::test]
async fn test_shared_with_reaches_collaborator() {
    let app = TestApp::new().await;
    let mut bob = app.connect(&app.token_for("bob")).await.unwrap();
    app.wait_for_sessions(1).await;

    app.engine.bus.publish(
        DomainEvent::new("task.task.shared", Some(OwnerId::from("alice")))
            .with_field("shared_with", "bob"),
    );

    let event = next_json(&mut bob).await;
    assert_eq!(event["event_type"], "task.task.shared");
    assert_eq!(event["data"]["shared_with"], "bob");
}

#[tokio::test]
async fn test_query_token_authenticates() {
    let app = TestApp::new().await;
    let mut client = app.connect_with_query(&app.token_for("carol")).await.unwrap();
    app.wait_for_sessions(1).await;

    let sessions = app.engine.hub.sessions().await.unwrap();
    assert_eq!(sessions[0].owner, OwnerId::from("carol"));

    app.engine
        .hub
        .send_to(sessions[0].id, "direct")
        .await
        .unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("direct"));
}

#[tokio::test]
async fn test_posted_event_reaches_connected_client() {
    let app = TestApp::new().await;
    let mut client = app.connect(&app.token_for("dave")).await.unwrap();
    app.wait_for_sessions(1).await;

    let response = app
        .request_as(
            "POST",
            "/events",
            Some(serde_json::json!({
                "event_type": "task.comment.added",
                "user_id": "dave",
                "comment": "looks good",
            })),
            Some(&app.token_for("task-service")),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let event = next_json(&mut client).await;
    assert_eq!(event["event_type"], "task.comment.added");
    assert_eq!(event["data"]["comment"], "looks good");
}

#[tokio::test]
async fn test_client_close_removes_session() {
    let app = TestApp::new().await;
    let mut client = app.connect(&app.token_for("erin")).await.unwrap();
    app.wait_for_sessions(1).await;

    client.send(Message::Close(None)).await.unwrap();
    app.wait_for_sessions(0).await;

    let metrics = app.engine.hub.metrics().snapshot();
    assert_eq!(metrics.sessions_registered, 1);
    assert_eq!(metrics.sessions_unregistered, 1);
}

#[tokio::test]
async fn test_dropped_connection_removes_session() {
    let app = TestApp::new().await;
    let client = app.connect(&app.token_for("frank")).await.unwrap();
    app.wait_for_sessions(1).await;

    drop(client);
    app.wait_for_sessions(0).await;
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let app = TestApp::new().await;
    let mut client = app.connect(&app.token_for("gina")).await.unwrap();
    app.wait_for_sessions(1).await;

    let summary = app.shutdown().await;
    assert_eq!(summary.sessions_closed, 1);

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = client.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => return true,
                Ok(_) => continue,
            }
        }
        true
    })
    .await
    .expect("client was not closed");
    assert!(closed);
}

#[tokio::test]
async fn test_anonymous_access_when_allowed() {
    let mut config = taskhub_core::config::AppConfig::default();
    config.auth.allow_anonymous = true;
    let app = TestApp::with_config(config).await;

    let _client = app.connect_anonymous().await.unwrap();
    app.wait_for_sessions(1).await;

    let sessions = app.engine.hub.sessions().await.unwrap();
    assert_eq!(sessions[0].owner, OwnerId::from("anonymous"));
}
