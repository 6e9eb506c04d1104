//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Provider id / provider type used for password-based accounts
pub const PROVIDER_CREDENTIALS: &str = "credentials";

/// Provider type recorded for accounts linked through an OAuth provider
pub const PROVIDER_TYPE_OAUTH: &str = "oauth";

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub email_verified: Option<String>,
    pub image_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Account database model - one authentication method bound to a user.
/// A user may own several (one per provider).
#[derive(FromRow, Debug, Clone)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub provider_type: String,
    pub provider_id: String,
    pub provider_account_id: String,
    pub password_hash: Option<String>,
    pub oauth_access_token: Option<String>,
    pub oauth_refresh_token: Option<String>,
    pub oauth_token_expires_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// The authenticated identity attached to a request after token validation.
/// Built once per request by the authentication middleware; handlers read it
/// through the `AuthedUser` extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub authorities: Vec<Authority>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    AuthenticatedUser,
}

/// An external OAuth identity to reconcile against the identity store
#[derive(Debug, Clone)]
pub struct OAuthIdentity {
    pub provider_id: String,
    pub provider_account_id: String,
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

/// POST /api/v1/auth/register request body
#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// POST /api/v1/auth/login request body
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Identity payload returned after registration
#[derive(Serialize, Debug)]
pub struct UserResponse {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

/// Identity plus bearer token returned after login
#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub token: String,
}
