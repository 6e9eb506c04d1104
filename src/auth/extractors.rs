//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::models::Principal;
use crate::common::ApiError;

/// Authenticated user extractor
///
/// Reads the principal attached by the authentication middleware. Protected
/// handlers take this as an argument; requests without a principal are
/// rejected here with 401, which is the authorization decision the
/// middleware deliberately does not make.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Principal>() {
            Some(principal) => Ok(AuthedUser {
                id: principal.user_id.clone(),
                email: principal.email.clone(),
            }),
            None => {
                warn!(path = %parts.uri.path(), "Unauthenticated request to protected route");
                Err(ApiError::Unauthorized(
                    "missing or invalid bearer token".to_string(),
                ))
            }
        }
    }
}
