// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::token::TokenCodec;
use crate::services::ai::AiService;

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub token_codec: Arc<TokenCodec>,
    pub ai_service: Arc<AiService>,
}
