//! Application builder: wires router, middleware and state into an Axum app.

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use taskhub_core::AppResult;
use taskhub_core::error::AppError;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);

    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` on `listener` until `shutdown` flips to `true`.
///
/// Open WebSocket connections are not waited on here: the hub closes them as
/// part of its own shutdown handshake.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> AppResult<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("TaskHub gateway listening on {}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // A dropped sender also ends the server.
            let _ = shutdown.wait_for(|stop| *stop).await;
            tracing::info!("HTTP server shutting down");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))
}
