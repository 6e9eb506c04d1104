// src/main.rs
use anyhow::Context;
use axum::{extract::Extension, middleware, routing::get, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod chat;
mod common;
mod insights;
mod services;
mod users;

use auth::token::TokenCodec;
use common::AppState;
use services::AiService;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://rolefit_api.db".to_string());

    // The signing key has no default on purpose: a guessable key would let
    // anyone mint valid tokens, so refuse to start without a real one.
    let jwt_secret = env::var("JWT_SECRET")
        .context("JWT_SECRET must be set (at least 32 bytes); refusing to start without it")?;
    let token_codec = TokenCodec::from_secret(&jwt_secret)?;

    let gemini_api_key = env::var("GEMINI_API_KEY").ok();
    let gemini_model =
        env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

    if gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set - analysis and chat endpoints will return 503");
    }

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().build()?;

    let ai_service = Arc::new(AiService::new(http_client, gemini_api_key, gemini_model));
    info!("AiService initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        db: pool,
        token_codec: Arc::new(token_codec),
        ai_service,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        // ====================================================================
        // AUTHENTICATION ROUTES (public)
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // USER ROUTES (OAuth synchronization, public)
        // ====================================================================
        .merge(users::users_routes())
        // ====================================================================
        // INSIGHT ROUTES (protected)
        // ====================================================================
        .merge(insights::insights_routes())
        // ====================================================================
        // CHAT ROUTES (protected)
        // ====================================================================
        .merge(chat::chat_routes())
        .route("/hello", get(hello))
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        // Authentication attaches a principal when a valid bearer token is
        // present; protected handlers reject requests without one.
        .layer(middleware::from_fn(auth::middleware::authenticate))
        .layer(Extension(shared.clone()))
        .layer({
            let cors_origins = std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string());

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// GET /hello - liveness probe, deliberately outside the protected surface
async fn hello() -> &'static str {
    "RoleFit API is running"
}
