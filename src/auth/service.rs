//! Credential registration/authentication and OAuth identity reconciliation

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::models::{OAuthIdentity, User, PROVIDER_CREDENTIALS, PROVIDER_TYPE_OAUTH};
use super::password::{hash_password, verify_password};
use super::store::{self, NewAccount};
use crate::common::{safe_email_log, ApiError};

/// Single message for every credential failure. Unknown email, OAuth-only
/// user, and wrong password must be indistinguishable to the caller so the
/// endpoint cannot be used to enumerate registered addresses.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Register a new password-based user.
///
/// Creates the user together with its "credentials" account in one
/// transaction. The duplicate-email check is advisory; the unique index on
/// users.email is the arbiter when two registrations race.
pub async fn register(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    info!(email = %safe_email_log(email), "Attempting to register user");

    if store::exists_user_with_email(pool, email)
        .await
        .map_err(ApiError::DatabaseError)?
    {
        warn!(email = %safe_email_log(email), "Registration failed: email already in use");
        return Err(ApiError::Conflict("Email address already in use".to_string()));
    }

    let password_hash = run_bcrypt({
        let password = password.to_string();
        move || hash_password(&password)
    })
    .await?;

    let result = store::create_user_with_account(
        pool,
        Some(name),
        email,
        None,
        NewAccount {
            provider_type: PROVIDER_CREDENTIALS,
            provider_id: PROVIDER_CREDENTIALS,
            provider_account_id: email,
            password_hash: Some(&password_hash),
        },
    )
    .await;

    match result {
        Ok(user) => {
            info!(
                user_id = %user.id,
                email = %safe_email_log(email),
                "User and credentials account saved successfully"
            );
            Ok(user)
        }
        Err(e) if store::is_unique_violation(&e) => {
            // Lost a registration race; the winner owns the email now
            warn!(email = %safe_email_log(email), "Registration conflict on insert");
            Err(ApiError::Conflict("Email address already in use".to_string()))
        }
        Err(e) => Err(ApiError::DatabaseError(e)),
    }
}

/// Authenticate an email/password pair, returning the matching user
pub async fn authenticate(
    pool: &SqlitePool,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let user = match store::find_user_by_email(pool, email)
        .await
        .map_err(ApiError::DatabaseError)?
    {
        Some(u) => u,
        None => {
            warn!(email = %safe_email_log(email), "Login failed: no such user");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    // A user who signed up via OAuth has no credentials account; the failure
    // must look exactly like a wrong password.
    let account = match store::find_account_for_user_and_provider(pool, &user.id, PROVIDER_CREDENTIALS)
        .await
        .map_err(ApiError::DatabaseError)?
    {
        Some(a) => a,
        None => {
            warn!(
                user_id = %user.id,
                "Login failed: user has no credentials account"
            );
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let hash = match account.password_hash {
        Some(h) => h,
        None => {
            warn!(user_id = %user.id, "Login failed: credentials account has no password hash");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let verified = run_bcrypt({
        let password = password.to_string();
        move || verify_password(&password, &hash)
    })
    .await?;

    if !verified {
        warn!(user_id = %user.id, "Login failed: password mismatch");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    info!(user_id = %user.id, email = %safe_email_log(email), "User login successful");
    Ok(user)
}

/// Idempotently ensure a user + account pair exists for an external OAuth
/// identity, returning the internal user id.
///
/// Precedence:
/// 1. account found by (provider_id, provider_account_id) - returning user;
///    refresh changed profile fields on its owner
/// 2. user found by email - link this provider to the existing user
///    (merge-by-email)
/// 3. neither - create user and account together
///
/// Two first-time reconciliations for the same identity can race past the
/// lookups; the unique constraints decide the winner and the loser re-runs
/// the chain once, finding the winner's rows.
pub async fn ensure_oauth_user(
    pool: &SqlitePool,
    identity: &OAuthIdentity,
) -> Result<String, ApiError> {
    if identity.provider_id.trim().is_empty()
        || identity.provider_account_id.trim().is_empty()
        || identity.email.trim().is_empty()
    {
        return Err(ApiError::BadRequest(
            "providerId, providerAccountId and email are required".to_string(),
        ));
    }

    info!(
        provider_id = %identity.provider_id,
        provider_account_id = %identity.provider_account_id,
        email = %safe_email_log(&identity.email),
        "Ensuring OAuth user"
    );

    match reconcile(pool, identity).await {
        Err(ApiError::Conflict(msg)) => {
            // Lost a check-then-act race; the winner's rows exist now, so one
            // re-run resolves to them. A second conflict surfaces as-is.
            warn!(
                provider_account_id = %identity.provider_account_id,
                "Reconciliation lost a uniqueness race, retrying: {}",
                msg
            );
            reconcile(pool, identity).await
        }
        other => other,
    }
}

/// One pass over the reconciliation precedence chain
async fn reconcile(pool: &SqlitePool, identity: &OAuthIdentity) -> Result<String, ApiError> {
    // 1. Returning OAuth user?
    if let Some(account) =
        store::find_account_by_provider_identity(pool, &identity.provider_id, &identity.provider_account_id)
            .await
            .map_err(ApiError::DatabaseError)?
    {
        let user = store::find_user_by_id(pool, &account.user_id)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| {
                error!(
                    account_id = %account.id,
                    provider_account_id = %identity.provider_account_id,
                    "CRITICAL: OAuth account exists without an owning user"
                );
                ApiError::InternalServer(
                    "OAuth account found without an associated user".to_string(),
                )
            })?;

        refresh_profile(pool, &user, identity).await?;
        return finish(user.id);
    }

    // 2. Same email registered under another provider? Link to it.
    if let Some(user) = store::find_user_by_email(pool, &identity.email)
        .await
        .map_err(ApiError::DatabaseError)?
    {
        info!(
            user_id = %user.id,
            provider_id = %identity.provider_id,
            "User found by email, linking new OAuth account"
        );
        let linked = store::link_account(
            pool,
            &user.id,
            NewAccount {
                provider_type: PROVIDER_TYPE_OAUTH,
                provider_id: &identity.provider_id,
                provider_account_id: &identity.provider_account_id,
                password_hash: None,
            },
        )
        .await;
        return match linked {
            Ok(_) => finish(user.id),
            Err(e) if store::is_unique_violation(&e) => Err(ApiError::Conflict(
                "provider identity was linked concurrently".to_string(),
            )),
            Err(e) => Err(ApiError::DatabaseError(e)),
        };
    }

    // 3. Previously unseen identity: create user and account atomically
    info!(
        email = %safe_email_log(&identity.email),
        provider_id = %identity.provider_id,
        "No user found by email, creating new user for OAuth"
    );
    let created = store::create_user_with_account(
        pool,
        identity.name.as_deref(),
        &identity.email,
        identity.image_url.as_deref(),
        NewAccount {
            provider_type: PROVIDER_TYPE_OAUTH,
            provider_id: &identity.provider_id,
            provider_account_id: &identity.provider_account_id,
            password_hash: None,
        },
    )
    .await;

    match created {
        Ok(user) => finish(user.id),
        Err(e) if store::is_unique_violation(&e) => Err(ApiError::Conflict(
            "user or provider identity was created concurrently".to_string(),
        )),
        Err(e) => Err(ApiError::DatabaseError(e)),
    }
}

/// Refresh mutable profile fields when the provider reports changed values
async fn refresh_profile(
    pool: &SqlitePool,
    user: &User,
    identity: &OAuthIdentity,
) -> Result<(), ApiError> {
    let new_name = identity
        .name
        .as_deref()
        .filter(|n| Some(*n) != user.name.as_deref());
    let new_image = identity
        .image_url
        .as_deref()
        .filter(|i| Some(*i) != user.image_url.as_deref());

    if new_name.is_some() || new_image.is_some() {
        store::update_user_profile(pool, &user.id, new_name, new_image)
            .await
            .map_err(ApiError::DatabaseError)?;
        info!(user_id = %user.id, "Updated profile fields from OAuth provider");
    }
    Ok(())
}

/// Defensive invariant check: reconciliation must end with a resolvable id
fn finish(user_id: String) -> Result<String, ApiError> {
    if user_id.trim().is_empty() {
        error!("CRITICAL: reconciliation finished without a valid user id");
        return Err(ApiError::InternalServer(
            "Failed to obtain a valid user id during OAuth synchronization".to_string(),
        ));
    }
    Ok(user_id)
}

/// bcrypt is deliberately slow; keep it off the async workers
async fn run_bcrypt<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, bcrypt::BcryptError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!(error = %e, "bcrypt task failed to complete");
            ApiError::InternalServer("Password processing failed".to_string())
        })?
        .map_err(|e| {
            error!(error = %e, "bcrypt failure");
            ApiError::InternalServer("Password processing failed".to_string())
        })
}
