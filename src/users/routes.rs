//! User routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the users router
///
/// # Routes
/// - `POST /api/v1/users/ensure-oauth` - Reconcile an external OAuth identity
pub fn users_routes() -> Router {
    Router::new().route("/api/v1/users/ensure-oauth", post(handlers::ensure_oauth_user))
}
