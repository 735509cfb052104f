//! Identity extraction for WebSocket upgrades.
//!
//! The hub treats the owner ID as an opaque label; this module is where it
//! comes from.

pub mod jwt;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use taskhub_core::AppError;
use taskhub_core::types::OwnerId;

pub use jwt::{Claims, JwtVerifier};

/// Owner label used when anonymous connections are allowed.
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Owner ID sessions are registered under.
    pub owner_id: OwnerId,
    /// Email claim, when present.
    pub email: Option<String>,
}

impl Identity {
    /// The shared identity of unauthenticated clients.
    pub fn anonymous() -> Self {
        Self {
            owner_id: OwnerId::from(ANONYMOUS_OWNER),
            email: None,
        }
    }
}

/// Why a caller could not be identified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No bearer header and no `token` query parameter.
    #[error("Missing access token")]
    MissingToken,
    /// The token's `exp` has passed.
    #[error("Token has expired")]
    Expired,
    /// The token was not signed with the shared secret.
    #[error("Invalid token signature")]
    InvalidSignature,
    /// Anything else wrong with the token.
    #[error("Invalid token: {0}")]
    Invalid(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::unauthorized(err.to_string())
    }
}

/// Token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the caller. The header wins over the query parameter; a token
/// that is present but invalid is always rejected, even when anonymous
/// access is allowed.
pub fn authenticate(
    verifier: &JwtVerifier,
    allow_anonymous: bool,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<Identity, AuthError> {
    let token = bearer_token(headers).or(query_token.filter(|t| !t.is_empty()));

    match token {
        Some(token) => verifier.verify(token),
        None if allow_anonymous => Ok(Identity::anonymous()),
        None => Err(AuthError::MissingToken),
    }
}
