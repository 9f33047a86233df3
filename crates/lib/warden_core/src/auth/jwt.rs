//! Signed session token generation and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::Value;
use tracing::debug;

use super::AuthError;
use crate::config::{AuthConfig, DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES};
use crate::models::auth::{Claims, TokenClaims};

/// Payload keys owned by [`Claims`] fields or the codec itself.
const RESERVED_CLAIMS: [&str; 5] = ["sub", "trust_level", "id", "name", "exp"];

/// Issues and decodes HMAC-signed JWTs with a mandatory `exp` claim.
///
/// Expiry is compared against the current time with zero leeway.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl TokenCodec {
    /// Codec for `secret` using the 15 minute default lifetime.
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            default_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.secret_key.as_bytes(), config.algorithm)
            .with_default_ttl(config.access_token_ttl)
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Sign `claims` with `exp = now + ttl` (or the default lifetime).
    ///
    /// The typed claims and `exp` always win over same-named keys in
    /// `extra`; those keys are dropped from the payload.
    pub fn issue(&self, claims: &Claims, ttl: Option<Duration>) -> Result<String, AuthError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Internal(format!("token ttl out of range: {ttl}")))?;

        let mut payload = claims.extra.clone();
        for key in RESERVED_CLAIMS {
            if payload.remove(key).is_some() {
                debug!(claim = key, sub = %claims.sub, "dropped reserved claim from extra");
            }
        }
        payload.insert("sub".to_string(), Value::from(claims.sub.as_str()));
        payload.insert("trust_level".to_string(), Value::from(claims.trust_level));
        if let Some(id) = claims.id {
            payload.insert("id".to_string(), Value::from(id));
        }
        if let Some(name) = &claims.name {
            payload.insert("name".to_string(), Value::from(name.as_str()));
        }
        payload.insert("exp".to_string(), Value::from(expires_at.timestamp()));

        encode(&Header::new(self.algorithm), &payload, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify signature, structure and expiry, returning the claims.
    ///
    /// Every failure is reported as `InvalidToken`; the reason only reaches
    /// the debug log.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "rejected session token");
                AuthError::InvalidToken
            })
    }
}
