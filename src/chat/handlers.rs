//! Chat proxy handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::models::{ChatRequest, ChatResponse};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use crate::services::ai::AiError;

/// POST /api/v1/chat/gemini
/// Forwards a prompt to the AI backend and returns its reply
pub async fn chat(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Prompt cannot be blank".to_string()));
    }

    info!(user_id = %authed.id, prompt_chars = payload.prompt.len(), "Received chat request");

    let state = state_lock.read().await.clone();

    let message = state.ai_service.generate(&payload.prompt).await.map_err(|e| match e {
        AiError::NotConfigured => {
            ApiError::ServiceUnavailable("AI chat service is not configured".to_string())
        }
        other => {
            error!(error = %other, "Chat request to AI backend failed");
            ApiError::InternalServer("Could not get response from AI service".to_string())
        }
    })?;

    Ok(Json(ChatResponse { message }))
}
