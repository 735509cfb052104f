//! Integration tests for health and event ingress endpoints.

use axum::http::StatusCode;
use serde_json::json;

use taskhub_core::config::AppConfig;

use crate::helpers::{TestApp, next_json};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = TestApp::new().await;
    let _client = app.connect(&app.token_for("u1")).await.unwrap();
    let _second = app.connect(&app.token_for("u1")).await.unwrap();
    app.wait_for_sessions(2).await;

    let response = app.request("GET", "/health/detailed", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["sessions"], 2);
    assert_eq!(response.body["data"]["owners"], 1);
    assert!(response.body["data"]["metrics"].is_object());
}

#[tokio::test]
async fn test_event_without_type_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_as(
            "POST",
            "/events",
            Some(json!({ "user_id": "u1" })),
            Some(&app.token_for("task-service")),
        )
        .await;

    assert!(response.status.is_client_error());
    assert_ne!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_event_without_credentials_is_unauthorized() {
    let app = TestApp::new().await;
    let mut client = app.connect(&app.token_for("u1")).await.unwrap();
    app.wait_for_sessions(1).await;

    let response = app
        .request(
            "POST",
            "/events",
            Some(json!({ "event_type": "system.maintenance", "user_id": "u1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");

    let response = app
        .request_as(
            "POST",
            "/events",
            Some(json!({ "event_type": "task.task.created", "user_id": "u1" })),
            Some(&app.token_for("task-service")),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    // The rejected broadcast never went out; the first event seen is the accepted one.
    let event = next_json(&mut client).await;
    assert_eq!(event["event_type"], "task.task.created");
}

#[tokio::test]
async fn test_event_ingress_is_not_mounted_by_default() {
    let app = TestApp::with_config(AppConfig::default()).await;

    let response = app
        .request_as(
            "POST",
            "/events",
            Some(json!({ "event_type": "task.task.created" })),
            Some(&app.token_for("task-service")),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_accepted_reports_id() {
    let app = TestApp::new().await;

    let response = app
        .request_as(
            "POST",
            "/events",
            Some(json!({
                "event_id": "7f1c9a3e-0000-4000-8000-000000000001",
                "event_type": "task.task.deleted",
                "user_id": "u1",
            })),
            Some(&app.token_for("task-service")),
        )
        .await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(
        response.body["data"]["event_id"],
        "7f1c9a3e-0000-4000-8000-000000000001"
    );
    assert_eq!(response.body["data"]["subscribers"], 1);
}

#[tokio::test]
async fn test_events_unavailable_after_shutdown() {
    let app = TestApp::new().await;
    let router = app.router.clone();
    let token = app.token_for("task-service");
    app.engine.hub.shutdown();

    let response = tower::ServiceExt::oneshot(
        router,
        axum::http::Request::post("/events")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {token}"))
            .body(axum::body::Body::from(
                json!({ "event_type": "task.task.created" }).to_string(),
            ))
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
