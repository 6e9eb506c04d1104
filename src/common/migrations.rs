// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing. Uniqueness that the domain depends on is
/// enforced here, at the storage layer: one user per email, one account per
/// (provider_id, provider_account_id) pair. Application code treats the
/// resulting constraint violations as conflicts, never as something to
/// pre-check around.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Only drop tables if RESET_DB environment variable is set to "true"
    // This prevents data loss on server restarts
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("Dropped old tables");
    }

    create_identity_tables(pool).await?;
    create_insight_tables(pool).await?;
    create_indexes(pool).await?;

    info!("✅ Database migration completed successfully");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DROP TABLE IF EXISTS insights").execute(pool).await?;
    sqlx::query("DROP TABLE IF EXISTS accounts").execute(pool).await?;
    sqlx::query("DROP TABLE IF EXISTS users").execute(pool).await?;
    Ok(())
}

/// Users and their linked authentication accounts
async fn create_identity_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT,
            email TEXT NOT NULL UNIQUE,
            email_verified TEXT,
            image_url TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // password_hash is present only for the "credentials" provider; the
    // oauth_* token columns are stored when a provider sends them but are
    // never consulted for authorization decisions.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            provider_type TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            provider_account_id TEXT NOT NULL,
            password_hash TEXT,
            oauth_access_token TEXT,
            oauth_refresh_token TEXT,
            oauth_token_expires_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (provider_id, provider_account_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Identity tables ready");
    Ok(())
}

/// Stored analysis results, one row per processed resume/job-description pair
async fn create_insight_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS insights (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            job_title TEXT NOT NULL,
            resume_filename TEXT,
            match_score REAL,
            ats_score REAL,
            analysis_result TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Insight tables ready");
    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_accounts_user_id ON accounts(user_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_insights_user_created ON insights(user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;
    Ok(())
}
