//! Bearer token extraction.
//!
//! When `AUTH_SECRET` is configured every sync request must carry
//! `Authorization: Bearer <secret>`. Without it the server runs open and
//! requests are treated as anonymous.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Identity of the caller of a sync endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    /// Presented the configured bearer token
    Token,
    /// No secret is configured
    Anonymous,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.auth_secret.as_deref() else {
            return Ok(AuthUser::Anonymous);
        };

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth_header.and_then(|header| header.strip_prefix("Bearer ")) {
            Some(token) if token == secret => Ok(AuthUser::Token),
            Some(_) => {
                tracing::debug!("Rejected request with wrong bearer token");
                Err(AppError::Unauthorized)
            }
            None => {
                tracing::debug!("Rejected request without bearer token");
                Err(AppError::Unauthorized)
            }
        }
    }
}
