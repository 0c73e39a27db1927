//! Bearer credential for the simulated platform calls.
//!
//! The signing secret comes from the environment; a missing secret is a
//! configuration-class authentication failure, never retried.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use sentinel_core::{Result, SentinelError};

/// JWT claims carried by the publisher credential.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublisherClaims {
    /// Fixed subject for pipeline-issued tokens.
    pub sub: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Issues short-lived HS256 bearer tokens.
#[derive(Clone, Debug)]
pub struct BearerTokenSource {
    secret_env: String,
    ttl_secs: i64,
}

impl BearerTokenSource {
    #[must_use]
    pub fn new(secret_env: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret_env: secret_env.into(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(3600),
        }
    }

    /// Issue a fresh token.
    pub fn issue(&self) -> Result<String> {
        let secret = std::env::var(&self.secret_env).map_err(|_| {
            SentinelError::Authentication(format!(
                "signing secret env var {} not set",
                self.secret_env
            ))
        })?;
        let now = Utc::now().timestamp();
        let claims = PublisherClaims {
            sub: "publisher".to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| SentinelError::Authentication(format!("token signing failed: {e}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn missing_secret_is_an_authentication_error() {
        let source = BearerTokenSource::new("SENTINEL_TEST_SECRET_NOT_SET", 3600);
        assert_matches!(source.issue(), Err(SentinelError::Authentication(_)));
    }

    #[test]
    fn issued_token_carries_bounded_lifetime() {
        // env vars are process-global; use a name unique to this test
        std::env::set_var("SENTINEL_TEST_SECRET_TOKEN_TEST", "s3cret");
        let source = BearerTokenSource::new("SENTINEL_TEST_SECRET_TOKEN_TEST", 3600);
        let token = source.issue().unwrap();

        let decoded = decode::<PublisherClaims>(
            &token,
            &DecodingKey::from_secret(b"s3cret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "publisher");
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 3600);
    }
}
