//! Identity store - durable lookup/mutation of users and linked accounts
//!
//! Uniqueness (one user per email, one account per provider identity) is
//! enforced by the schema in `common::migrations`, not by check-then-insert
//! logic here. Callers detect the resulting failures with
//! [`is_unique_violation`] and translate them into domain-level conflicts.

use sqlx::error::ErrorKind;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::{Account, User};

/// Fields for an account about to be inserted
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub provider_type: &'a str,
    pub provider_id: &'a str,
    pub provider_account_id: &'a str,
    pub password_hash: Option<&'a str>,
}

/// True when the error is a storage-level unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.kind() == ErrorKind::UniqueViolation)
}

pub async fn find_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn exists_user_with_email(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await
}

/// Look up an account by the globally unique (provider_id, provider_account_id) pair
pub async fn find_account_by_provider_identity(
    pool: &SqlitePool,
    provider_id: &str,
    provider_account_id: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE provider_id = ? AND provider_account_id = ?",
    )
    .bind(provider_id)
    .bind(provider_account_id)
    .fetch_optional(pool)
    .await
}

/// Look up the account a given user holds for a given provider
pub async fn find_account_for_user_and_provider(
    pool: &SqlitePool,
    user_id: &str,
    provider_id: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE user_id = ? AND provider_id = ?")
        .bind(user_id)
        .bind(provider_id)
        .fetch_optional(pool)
        .await
}

/// Insert a user together with its first account in a single transaction.
/// Either both rows land or neither does.
pub async fn create_user_with_account(
    pool: &SqlitePool,
    name: Option<&str>,
    email: &str,
    image_url: Option<&str>,
    account: NewAccount<'_>,
) -> Result<User, sqlx::Error> {
    let user_id = Uuid::new_v4().to_string();
    let account_id = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, image_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, datetime('now'), datetime('now'))
        "#,
    )
    .bind(&user_id)
    .bind(name)
    .bind(email)
    .bind(image_url)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO accounts (id, user_id, provider_type, provider_id, provider_account_id,
                              password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))
        "#,
    )
    .bind(&account_id)
    .bind(&user_id)
    .bind(account.provider_type)
    .bind(account.provider_id)
    .bind(account.provider_account_id)
    .bind(account.password_hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_one(pool)
        .await
}

/// Attach an additional account to an existing user
pub async fn link_account(
    pool: &SqlitePool,
    user_id: &str,
    account: NewAccount<'_>,
) -> Result<Account, sqlx::Error> {
    let account_id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO accounts (id, user_id, provider_type, provider_id, provider_account_id,
                              password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))
        "#,
    )
    .bind(&account_id)
    .bind(user_id)
    .bind(account.provider_type)
    .bind(account.provider_id)
    .bind(account.provider_account_id)
    .bind(account.password_hash)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
        .bind(&account_id)
        .fetch_one(pool)
        .await
}

/// Update mutable profile fields. Only the fields passed as `Some` change.
pub async fn update_user_profile(
    pool: &SqlitePool,
    user_id: &str,
    name: Option<&str>,
    image_url: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            image_url = COALESCE(?, image_url),
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(image_url)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}
