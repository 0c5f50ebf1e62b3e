//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use memverse_engine::Error as EngineError;
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// HTTP status reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Engine(e) => match e {
                EngineError::InvalidRecord { .. } | EngineError::MalformedCutoff(_) => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::DuplicateName(_) => StatusCode::CONFLICT,
                EngineError::DanglingReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            },
            AppError::BadRequest(_) | AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_message, details) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None)
            }
            AppError::Engine(e) => {
                tracing::warn!("Push or pull rejected: {}", e);
                (e.to_string(), None)
            }
            AppError::BadRequest(msg) => (msg.clone(), None),
            AppError::Unauthorized => ("Unauthorized".to_string(), None),
            AppError::InvalidBody(reason) => {
                tracing::debug!("Rejected push body: {}", reason);
                ("Invalid request body".to_string(), Some(reason.clone()))
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use memverse_engine::EntityKind;

    #[test]
    fn engine_errors_map_to_client_statuses() {
        let cases = [
            (
                EngineError::MalformedCutoff("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::InvalidRecord {
                    kind: EntityKind::Card,
                    reason: "verseId must not be empty".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (EngineError::DuplicateName("Psalms".into()), StatusCode::CONFLICT),
            (
                EngineError::DanglingReference {
                    kind: EntityKind::Card,
                    id: "c".into(),
                    target: EntityKind::Collection,
                    target_id: "x".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn request_and_server_failures() {
        assert_eq!(
            AppError::Database(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::InvalidBody("expected a sequence".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
