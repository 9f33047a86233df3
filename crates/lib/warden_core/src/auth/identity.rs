//! Request identity resolution.
//!
//! Turns the raw token the transport layer extracted (usually the
//! [`TOKEN_COOKIE`] cookie) into a [`CallerIdentity`], or fails closed with
//! `Unauthorized`. There is no partially authenticated outcome.

use tracing::debug;

use super::AuthError;
use super::jwt::TokenCodec;
use crate::models::auth::CallerIdentity;

/// Cookie name the transport layer stores the session token under.
pub const TOKEN_COOKIE: &str = "token";

/// Resolves callers from session tokens.
#[derive(Clone)]
pub struct IdentityResolver {
    codec: TokenCodec,
}

impl IdentityResolver {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    /// Resolve the caller from an optional token.
    ///
    /// A missing token, a token that fails to decode, or one without a
    /// subject all yield `Unauthorized`.
    pub fn resolve(&self, token: Option<&str>) -> Result<CallerIdentity, AuthError> {
        let Some(token) = token else {
            debug!("no session token presented");
            return Err(AuthError::Unauthorized);
        };

        let decoded = self
            .codec
            .decode(token)
            .map_err(|_| AuthError::Unauthorized)?;

        if decoded.claims.sub.trim().is_empty() {
            debug!("session token has an empty subject");
            return Err(AuthError::Unauthorized);
        }

        Ok(CallerIdentity::from(decoded.claims))
    }

    /// Resolve the caller and run it through the active-account gate.
    pub fn resolve_active(&self, token: Option<&str>) -> Result<CallerIdentity, AuthError> {
        self.resolve(token).and_then(require_active)
    }
}

/// Active-account gate. Currently admits every resolved identity unchanged;
/// ban and deactivation checks hook in here.
pub fn require_active(identity: CallerIdentity) -> Result<CallerIdentity, AuthError> {
    Ok(identity)
}
