//! User synchronization handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::models::{EnsureOAuthRequest, EnsureOAuthResponse};
use crate::auth::service;
use crate::common::{ApiError, AppState};

/// POST /api/v1/users/ensure-oauth
/// Called by the frontend session layer after a successful OAuth provider
/// sign-in; maps the external identity to an internal user, creating or
/// linking as needed.
///
/// # Response
/// `200` with `{userId}`; `400` when a required field is blank
pub async fn ensure_oauth_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<EnsureOAuthRequest>,
) -> Result<Json<EnsureOAuthResponse>, ApiError> {
    info!(
        provider_id = %payload.provider_id,
        provider_account_id = %payload.provider_account_id,
        "Received ensure-oauth request"
    );

    let state = state_lock.read().await.clone();

    let user_id = service::ensure_oauth_user(&state.db, &payload.into()).await?;

    info!(user_id = %user_id, "Successfully ensured OAuth user");

    Ok(Json(EnsureOAuthResponse { user_id }))
}
