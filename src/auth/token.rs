//! Stateless bearer token issue/validation

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::warn;

use super::models::Claims;

/// Bearer token lifetime issued on login
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Minimum acceptable signing key length in bytes
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token is expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
#[error("JWT_SECRET must be set and at least 32 bytes long")]
pub struct WeakSecretError;

/// Issues and validates signed, stateless bearer tokens (HS256).
///
/// The signing key is loaded once at startup; there is deliberately no
/// default key, so a missing or short secret aborts startup instead of
/// silently downgrading to a guessable one.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn from_secret(secret: &str) -> Result<Self, WeakSecretError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(WeakSecretError);
        }
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is authoritative; no grace window
        validation.leeway = 0;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Encode a token for the given identity with subject = user id and an
    /// `email` claim alongside issued-at/expiry timestamps.
    pub fn issue(
        &self,
        user_id: &str,
        email: &str,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Structural validation: parse, signature check, expiry check.
    ///
    /// Callers only need accept/reject; the sub-reason exists for logging.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            }),
        }
    }

    /// Structural validation plus a case-sensitive match of the token's
    /// email claim against `expected_email`. Defense in depth: a token that
    /// verifies structurally must still name the identity that was loaded
    /// from the store before it authenticates anything.
    pub fn validate_for_principal(&self, token: &str, expected_email: &str) -> bool {
        match self.validate(token) {
            Ok(claims) => {
                if claims.email == expected_email {
                    true
                } else {
                    warn!(
                        token_email = %claims.email,
                        expected_email = %expected_email,
                        "Token email claim does not match loaded identity"
                    );
                    false
                }
            }
            Err(_) => false,
        }
    }
}
