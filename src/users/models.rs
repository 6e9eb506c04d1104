//! User endpoint data models

use serde::{Deserialize, Serialize};

use crate::auth::models::OAuthIdentity;

/// POST /api/v1/users/ensure-oauth request body (camelCase wire names,
/// consumed by the frontend session layer after provider sign-in)
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EnsureOAuthRequest {
    pub provider_id: String,
    pub provider_account_id: String,
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

impl From<EnsureOAuthRequest> for OAuthIdentity {
    fn from(req: EnsureOAuthRequest) -> Self {
        OAuthIdentity {
            provider_id: req.provider_id,
            provider_account_id: req.provider_account_id,
            email: req.email,
            name: req.name,
            image_url: req.image_url,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EnsureOAuthResponse {
    pub user_id: String,
}
