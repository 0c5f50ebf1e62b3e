//! Sync endpoint routes.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use memverse_engine::{PushSummary, SyncBatch};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::handlers::{handle_pull, handle_push};
use crate::AppState;

/// Header carrying the client's last sync day.
pub const LAST_SYNC_HEADER: &str = "x-last-sync";

/// Query parameters for pull sync.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullQuery {
    /// Fallback for clients that cannot set the header
    pub last_sync: Option<String>,
}

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync/push", post(push_handler))
        .route("/sync/pull", get(pull_handler))
}

/// POST /sync/push - Store a client's records.
async fn push_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    body: std::result::Result<Json<SyncBatch>, JsonRejection>,
) -> Result<Json<PushSummary>> {
    let Json(batch) = body.map_err(|e| AppError::InvalidBody(e.body_text()))?;
    let summary = handle_push(state.store.as_ref(), state.config.reference_policy, batch).await?;
    Ok(Json(summary))
}

/// GET /sync/pull - Fetch records changed since the last sync.
async fn pull_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    headers: HeaderMap,
    Query(query): Query<PullQuery>,
) -> Result<Json<SyncBatch>> {
    let header = headers
        .get(LAST_SYNC_HEADER)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| AppError::BadRequest(format!("{LAST_SYNC_HEADER} is not valid text")))?
        .filter(|value| !value.trim().is_empty());
    let marker = header.or(query.last_sync.as_deref());

    let batch = handle_pull(state.store.as_ref(), marker).await?;
    Ok(Json(batch))
}
