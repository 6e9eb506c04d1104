//! Authentication handlers

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::models::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use super::service;
use super::token::TOKEN_TTL_HOURS;
use super::validators::{LoginRequestValidator, RegisterRequestValidator};
use crate::common::{safe_email_log, ApiError, AppState, Validator};

/// POST /api/v1/auth/register
/// Registers a new password-based user
///
/// # Request Body
/// ```json
/// {
///   "name": "Alice",
///   "email": "alice@example.com",
///   "password": "pw12345678"
/// }
/// ```
///
/// # Response
/// `201` with `{id, name, email}`; `409` when the email is taken
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let validation = RegisterRequestValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let state = state_lock.read().await.clone();

    let user = service::register(
        &state.db,
        payload.name.trim(),
        payload.email.trim(),
        &payload.password,
    )
    .await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "🔐 User registered successfully"
    );

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
        }),
    ))
}

/// POST /api/v1/auth/login
/// Authenticates an email/password pair and issues a bearer token
///
/// # Response
/// `200` with `{id, name, email, token}`; any credential failure is a
/// generic `401` that does not reveal whether the email exists
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let validation = LoginRequestValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let state = state_lock.read().await.clone();

    let user = service::authenticate(&state.db, payload.email.trim(), &payload.password).await?;

    let token = state
        .token_codec
        .issue(&user.id, &user.email, Duration::hours(TOKEN_TTL_HOURS))
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "JWT encoding error during login");
            ApiError::InternalServer("jwt error".to_string())
        })?;

    Ok(Json(LoginResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        token,
    }))
}
