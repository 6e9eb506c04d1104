//! Request authentication middleware
//!
//! Converts an incoming bearer token into a [`Principal`] attached to the
//! request extensions, or leaves the request unauthenticated. It never
//! rejects on its own: absence of a principal is the signal, and the
//! `AuthedUser` extractor turns that absence into a 401 on protected routes.

use axum::{
    extract::{Extension, Request},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::models::{Authority, Principal};
use super::store;
use crate::common::{safe_email_log, safe_token_log, AppState};

pub async fn authenticate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    mut request: Request,
    next: Next,
) -> Response {
    // 1. Extract bearer token; absence is a no-op
    let token = match bearer_token(&request) {
        Some(t) => t,
        None => return next.run(request).await,
    };

    let state = state_lock.read().await.clone();

    // 2. Structural validation: parse, signature, expiry
    let claims = match state.token_codec.validate(&token) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, token = %safe_token_log(&token), "Rejected bearer token");
            return next.run(request).await;
        }
    };

    // 3. The email claim carries the identity to load
    if claims.email.trim().is_empty() {
        warn!("Bearer token has no email claim");
        return next.run(request).await;
    }

    // 4. Re-entrancy guard for layered routers
    if request.extensions().get::<Principal>().is_some() {
        debug!("Request already carries a principal, skipping authentication");
        return next.run(request).await;
    }

    // 5. Load the identity the token claims to be
    let user = match store::find_user_by_email(&state.db, &claims.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(
                email = %safe_email_log(&claims.email),
                "Token refers to an unknown identity"
            );
            return next.run(request).await;
        }
        Err(e) => {
            error!(error = %e, "Database error during identity load, passing through unauthenticated");
            return next.run(request).await;
        }
    };

    // 6. Bind the token's claimed identity to the freshly loaded one
    if !state.token_codec.validate_for_principal(&token, &user.email) {
        return next.run(request).await;
    }

    // 7. Attach the principal for downstream handlers
    debug!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "Authenticated request via bearer token"
    );
    request.extensions_mut().insert(Principal {
        user_id: user.id,
        email: user.email,
        authorities: vec![Authority::AuthenticatedUser],
    });

    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}
