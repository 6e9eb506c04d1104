//! Insight routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the insights router
///
/// All routes require an authenticated principal.
///
/// # Routes
/// - `POST /api/v1/insights/process` - Analyze a resume/job-description pair
/// - `GET /api/v1/insights/history` - List the caller's insights
/// - `GET /api/v1/insights/latest` - Id of the most recent insight
/// - `GET /api/v1/insights/:id` - One insight by id
pub fn insights_routes() -> Router {
    Router::new()
        .route("/api/v1/insights/process", post(handlers::process_documents))
        .route("/api/v1/insights/history", get(handlers::get_insights_history))
        .route("/api/v1/insights/latest", get(handlers::get_latest_insight))
        .route("/api/v1/insights/:id", get(handlers::get_insight_by_id))
}
