//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use futures::StreamExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

use taskhub_api::auth::Claims;
use taskhub_api::{AppState, build_app, serve};
use taskhub_core::config::AppConfig;
use taskhub_core::AppResult;
use taskhub_realtime::{EngineTasks, HubSummary, RealtimeEngine};

/// A connected test client.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test application context: a gateway listening on an ephemeral port.
pub struct TestApp {
    /// The Axum router for in-process requests
    pub router: Router,
    /// Running engine, for publishing events and inspecting the hub
    pub engine: RealtimeEngine,
    /// Application config
    pub config: AppConfig,
    /// Bound address
    pub addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    tasks: EngineTasks,
    server: JoinHandle<AppResult<()>>,
}

impl TestApp {
    /// Start a gateway with default settings and event ingress mounted.
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.events.ingress_enabled = true;
        Self::with_config(config).await
    }

    /// Start a gateway with the given settings.
    pub async fn with_config(config: AppConfig) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (engine, tasks) =
            RealtimeEngine::start(&config.realtime, &config.events, shutdown_rx.clone());

        let state = AppState::new(Arc::new(config.clone()), engine.clone());
        let router = build_app(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let server = tokio::spawn(serve(listener, router.clone(), shutdown_rx));

        Self {
            router,
            engine,
            config,
            addr,
            shutdown,
            tasks,
            server,
        }
    }

    /// Sign an access token for `user_id` with the configured secret.
    pub fn token_for(&self, user_id: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            exp: now + 900,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .expect("Failed to sign token")
    }

    /// Open a WebSocket with a bearer header.
    pub async fn connect(&self, token: &str) -> Result<WsClient, WsError> {
        let mut request = format!("ws://{}/ws", self.addr)
            .into_client_request()
            .expect("Invalid ws url");
        request.headers_mut().insert(
            AUTHORIZATION,
            format!("Bearer {token}").parse().expect("Invalid header"),
        );
        connect_async(request).await.map(|(ws, _)| ws)
    }

    /// Open a WebSocket passing the token as a query parameter.
    pub async fn connect_with_query(&self, token: &str) -> Result<WsClient, WsError> {
        let url = format!("ws://{}/ws?token={token}", self.addr);
        connect_async(url).await.map(|(ws, _)| ws)
    }

    /// Open a WebSocket without credentials.
    pub async fn connect_anonymous(&self) -> Result<WsClient, WsError> {
        connect_async(format!("ws://{}/ws", self.addr))
            .await
            .map(|(ws, _)| ws)
    }

    /// Wait until the hub reports exactly `count` live sessions.
    pub async fn wait_for_sessions(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let live = self.engine.hub.sessions().await.expect("Hub closed");
                if live.len() == count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Timed out waiting for live sessions");
    }

    /// Make an in-process HTTP request.
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        self.request_as(method, path, body, None).await
    }

    /// Make an in-process HTTP request, with a bearer token when given.
    pub async fn request_as(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let req = builder
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Signal shutdown and wait for the hub handshake.
    pub async fn shutdown(self) -> HubSummary {
        let _ = self.shutdown.send(true);
        let summary = self
            .tasks
            .join(Duration::from_secs(5))
            .await
            .expect("Hub did not shut down");
        let _ = tokio::time::timeout(Duration::from_secs(5), self.server).await;
        summary
    }
}

/// Test response wrapper
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Next text message, skipping control frames.
pub async fn next_text(client: &mut WsClient) -> Option<String> {
    let read = async {
        while let Some(msg) = client.next().await {
            match msg {
                Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                _ => return None,
            }
        }
        None
    };

    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("Timed out waiting for a message")
}

/// Parse the next text message as JSON.
pub async fn next_json(client: &mut WsClient) -> Value {
    let text = next_text(client).await.expect("Connection ended");
    serde_json::from_str(&text).expect("Message is not JSON")
}
