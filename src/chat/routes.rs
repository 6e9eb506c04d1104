//! Chat routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the chat router
///
/// # Routes
/// - `POST /api/v1/chat/gemini` - Authenticated chat proxy to the AI backend
pub fn chat_routes() -> Router {
    Router::new().route("/api/v1/chat/gemini", post(handlers::chat))
}
