//! # taskhub-api
//!
//! HTTP layer for the TaskHub realtime gateway built on Axum.
//!
//! Provides the WebSocket transport adapter (`GET /ws`), JWT identity
//! extraction, health endpoints, the upstream event ingress
//! (`POST /events`), and the mapping from `AppError` to HTTP responses.

pub mod app;
pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, serve};
pub use state::AppState;
