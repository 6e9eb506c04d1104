//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - Token issue/validation and tampering resistance
//! - Password hashing
//! - Registration, login, and OAuth reconciliation against a real store
//! - The request authentication pipeline end to end

#[cfg(test)]
mod tests {
    use super::super::*;

    use axum::body::Body;
    use axum::extract::Extension;
    use axum::http::{Request, StatusCode};
    use axum::{middleware as axum_middleware, Router};
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    use crate::common::{ApiError, AppState};
    use crate::services::AiService;

    const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef-test";

    fn codec() -> token::TokenCodec {
        token::TokenCodec::from_secret(TEST_SECRET).expect("test secret is long enough")
    }

    async fn test_pool() -> SqlitePool {
        // A single connection so the whole test shares one in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        crate::common::migrations::run_migrations(&pool)
            .await
            .expect("migrations");
        pool
    }

    fn test_state(pool: SqlitePool) -> AppState {
        let http = reqwest::Client::new();
        AppState {
            db: pool,
            token_codec: Arc::new(codec()),
            ai_service: Arc::new(AiService::new(http, None, "gemini-2.0-flash".to_string())),
        }
    }

    /// Mirrors the router composition in main.rs closely enough to exercise
    /// the authentication middleware and the protected surface
    fn test_app(state: AppState) -> Router {
        Router::new()
            .merge(crate::auth::auth_routes())
            .merge(crate::users::users_routes())
            .merge(crate::insights::insights_routes())
            .merge(crate::chat::chat_routes())
            .layer(axum_middleware::from_fn(middleware::authenticate))
            .layer(Extension(Arc::new(RwLock::new(state))))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn count_accounts(pool: &SqlitePool, user_id: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn google_identity(email: &str) -> models::OAuthIdentity {
        models::OAuthIdentity {
            provider_id: "google".to_string(),
            provider_account_id: "g-123".to_string(),
            email: email.to_string(),
            name: Some("Alice".to_string()),
            image_url: Some("https://example.com/alice.png".to_string()),
        }
    }

    // ---- Token codec ----

    #[test]
    fn token_round_trip_returns_matching_claims() {
        let codec = codec();
        let token = codec
            .issue("user-1", "alice@example.com", Duration::hours(1))
            .unwrap();

        let claims = codec.validate(&token).expect("fresh token validates");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "alice@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_fails_validation() {
        let codec = codec();
        let token = codec
            .issue("user-1", "alice@example.com", Duration::seconds(-10))
            .unwrap();

        assert_eq!(codec.validate(&token), Err(token::TokenError::Expired));
    }

    #[test]
    fn tampered_signature_fails_validation() {
        let codec = codec();
        let token = codec
            .issue("user-1", "alice@example.com", Duration::hours(1))
            .unwrap();

        // Flip the last character of the signature segment
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        assert_eq!(parts.len(), 3);
        let sig = parts[2].clone();
        let replacement = if sig.ends_with('A') { "B" } else { "A" };
        parts[2] = format!("{}{}", &sig[..sig.len() - 1], replacement);
        let tampered = parts.join(".");

        assert!(codec.validate(&tampered).is_err());
    }

    #[test]
    fn token_signed_with_other_key_fails_validation() {
        let other = token::TokenCodec::from_secret("another-secret-key-of-enough-length!").unwrap();
        let token = other
            .issue("user-1", "alice@example.com", Duration::hours(1))
            .unwrap();

        assert_eq!(
            codec().validate(&token),
            Err(token::TokenError::BadSignature)
        );
    }

    #[test]
    fn garbage_token_is_malformed() {
        assert_eq!(
            codec().validate("not-a-jwt"),
            Err(token::TokenError::Malformed)
        );
    }

    #[test]
    fn validate_for_principal_requires_exact_email_match() {
        let codec = codec();
        let token = codec
            .issue("user-1", "alice@example.com", Duration::hours(1))
            .unwrap();

        assert!(codec.validate_for_principal(&token, "alice@example.com"));
        assert!(!codec.validate_for_principal(&token, "bob@example.com"));
        // comparison is case-sensitive
        assert!(!codec.validate_for_principal(&token, "Alice@example.com"));
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(token::TokenCodec::from_secret("too-short").is_err());
    }

    // ---- Password hashing ----

    #[test]
    fn password_hash_verifies_and_rejects_wrong_password() {
        let hash = password::hash_password("pw12345678").unwrap();
        assert_ne!(hash, "pw12345678");
        assert!(password::verify_password("pw12345678", &hash).unwrap());
        assert!(!password::verify_password("wrong-password", &hash).unwrap());
    }

    // ---- Validators ----

    #[test]
    fn register_validator_accepts_valid_request() {
        let request = models::RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "pw12345678".to_string(),
        };
        let result =
            crate::common::Validator::validate(&validators::RegisterRequestValidator, &request);
        assert!(result.is_valid);
    }

    #[test]
    fn register_validator_rejects_bad_fields() {
        let request = models::RegisterRequest {
            name: "A".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let result =
            crate::common::Validator::validate(&validators::RegisterRequestValidator, &request);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
    }

    // ---- Service against the store ----

    #[tokio::test]
    async fn register_then_authenticate_returns_same_user() {
        let pool = test_pool().await;

        let registered = service::register(&pool, "Alice", "alice@example.com", "pw12345678")
            .await
            .expect("registration succeeds");

        let authed = service::authenticate(&pool, "alice@example.com", "pw12345678")
            .await
            .expect("login succeeds");

        assert_eq!(registered.id, authed.id);
        assert_eq!(authed.email, "alice@example.com");

        // exactly one credentials account, hash stored, no oauth tokens
        let account = store::find_account_for_user_and_provider(
            &pool,
            &registered.id,
            models::PROVIDER_CREDENTIALS,
        )
        .await
        .unwrap()
        .expect("credentials account exists");
        assert_eq!(account.provider_type, models::PROVIDER_CREDENTIALS);
        assert_eq!(account.provider_id, models::PROVIDER_CREDENTIALS);
        assert_eq!(account.provider_account_id, "alice@example.com");
        assert!(account.password_hash.is_some());
        assert!(account.oauth_access_token.is_none());
        assert!(account.oauth_refresh_token.is_none());
        assert!(account.oauth_token_expires_at.is_none());
        assert!(account.created_at.is_some());
        assert!(account.updated_at.is_some());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_leaves_no_orphan_rows() {
        let pool = test_pool().await;

        service::register(&pool, "Alice", "alice@example.com", "pw12345678")
            .await
            .unwrap();

        let err = service::register(&pool, "Imposter", "alice@example.com", "different-pw1")
            .await
            .expect_err("second registration must fail");
        assert!(matches!(err, ApiError::Conflict(_)));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
        assert_eq!(accounts, 1);
    }

    #[tokio::test]
    async fn credential_failures_are_indistinguishable() {
        let pool = test_pool().await;

        service::register(&pool, "Alice", "alice@example.com", "pw12345678")
            .await
            .unwrap();

        let wrong_password = service::authenticate(&pool, "alice@example.com", "wrong-password")
            .await
            .expect_err("wrong password fails");
        let unknown_email = service::authenticate(&pool, "nobody@example.com", "pw12345678")
            .await
            .expect_err("unknown email fails");

        let (ApiError::Unauthorized(a), ApiError::Unauthorized(b)) =
            (&wrong_password, &unknown_email)
        else {
            panic!("both failures must be Unauthorized");
        };
        assert_eq!(a, b, "error messages must not reveal which part failed");
    }

    #[tokio::test]
    async fn oauth_only_user_cannot_password_login() {
        let pool = test_pool().await;

        service::ensure_oauth_user(&pool, &google_identity("alice@example.com"))
            .await
            .unwrap();

        let err = service::authenticate(&pool, "alice@example.com", "anything-at-all")
            .await
            .expect_err("no credentials account");
        let ApiError::Unauthorized(msg) = err else {
            panic!("must be Unauthorized");
        };
        assert_eq!(msg, service::INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn ensure_oauth_user_is_idempotent() {
        let pool = test_pool().await;
        let identity = google_identity("alice@example.com");

        let first = service::ensure_oauth_user(&pool, &identity).await.unwrap();
        let second = service::ensure_oauth_user(&pool, &identity).await.unwrap();

        assert_eq!(first, second);

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
        assert_eq!(count_accounts(&pool, &first).await, 1);
    }

    #[tokio::test]
    async fn ensure_oauth_user_merges_by_email() {
        let pool = test_pool().await;

        let registered = service::register(&pool, "Alice", "alice@example.com", "pw12345678")
            .await
            .unwrap();

        let merged = service::ensure_oauth_user(&pool, &google_identity("alice@example.com"))
            .await
            .unwrap();

        assert_eq!(registered.id, merged);
        assert_eq!(count_accounts(&pool, &registered.id).await, 2);

        // password login still works after the merge
        let authed = service::authenticate(&pool, "alice@example.com", "pw12345678")
            .await
            .unwrap();
        assert_eq!(authed.id, registered.id);
    }

    #[tokio::test]
    async fn ensure_oauth_user_refreshes_changed_profile_fields() {
        let pool = test_pool().await;

        let mut identity = google_identity("alice@example.com");
        let user_id = service::ensure_oauth_user(&pool, &identity).await.unwrap();

        identity.name = Some("Alice Cooper".to_string());
        identity.image_url = Some("https://example.com/new.png".to_string());
        service::ensure_oauth_user(&pool, &identity).await.unwrap();

        let user = store::find_user_by_id(&pool, &user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.name.as_deref(), Some("Alice Cooper"));
        assert_eq!(user.image_url.as_deref(), Some("https://example.com/new.png"));
    }

    #[tokio::test]
    async fn ensure_oauth_user_rejects_blank_required_fields() {
        let pool = test_pool().await;

        let mut identity = google_identity("alice@example.com");
        identity.provider_account_id = "   ".to_string();

        let err = service::ensure_oauth_user(&pool, &identity)
            .await
            .expect_err("blank provider account id");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    // ---- Request pipeline end to end ----

    #[tokio::test]
    async fn end_to_end_register_login_and_protected_access() {
        let pool = test_pool().await;
        let state = test_state(pool);
        let codec = state.token_codec.clone();
        let app = test_app(state);

        // register -> 201 with identity
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/register",
                serde_json::json!({
                    "name": "Alice",
                    "email": "alice@example.com",
                    "password": "pw12345678"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let registered = body_json(response).await;
        let registered_id = registered["id"].as_str().unwrap().to_string();
        assert_eq!(registered["email"], "alice@example.com");

        // login -> 200 with identity and token
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                serde_json::json!({
                    "email": "alice@example.com",
                    "password": "pw12345678"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let login = body_json(response).await;
        assert_eq!(login["id"], registered_id.as_str());
        let bearer = login["token"].as_str().unwrap().to_string();

        // protected route without a token -> 401
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/insights/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // protected route with the issued token -> 200 (empty history)
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/insights/history")
                    .header("authorization", format!("Bearer {}", bearer))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));

        // token naming an identity that does not exist -> 401
        let ghost = codec
            .issue("ghost-id", "ghost@example.com", Duration::hours(1))
            .unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/insights/history")
                    .header("authorization", format!("Bearer {}", ghost))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // expired token -> 401
        let expired = codec
            .issue(&registered_id, "alice@example.com", Duration::seconds(-10))
            .unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/insights/history")
                    .header("authorization", format!("Bearer {}", expired))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // ensure-oauth with the same email merges into the registered user
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/users/ensure-oauth",
                serde_json::json!({
                    "providerId": "google",
                    "providerAccountId": "g-123",
                    "email": "alice@example.com"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ensured = body_json(response).await;
        assert_eq!(ensured["userId"], registered_id.as_str());
    }

    #[tokio::test]
    async fn ensure_oauth_endpoint_rejects_blank_fields_with_400() {
        let pool = test_pool().await;
        let app = test_app(test_state(pool));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/users/ensure-oauth",
                serde_json::json!({
                    "providerId": "",
                    "providerAccountId": "g-1",
                    "email": "alice@example.com"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_requires_auth_and_reports_unconfigured_backend() {
        let pool = test_pool().await;
        let state = test_state(pool.clone());
        let codec = state.token_codec.clone();
        let app = test_app(state);

        let user = service::register(&pool, "Alice", "alice@example.com", "pw12345678")
            .await
            .unwrap();
        let bearer = codec
            .issue(&user.id, &user.email, Duration::hours(1))
            .unwrap();

        // unauthenticated -> 401 before the AI backend is ever consulted
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/chat/gemini",
                serde_json::json!({ "prompt": "hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // authenticated but no API key configured -> 503
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/chat/gemini")
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {}", bearer))
                    .body(Body::from(
                        serde_json::json!({ "prompt": "hello" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn login_with_invalid_credentials_returns_generic_401() {
        let pool = test_pool().await;
        let app = test_app(test_state(pool));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                serde_json::json!({
                    "email": "nobody@example.com",
                    "password": "pw12345678"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], service::INVALID_CREDENTIALS);
    }
}
