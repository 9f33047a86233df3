//! Authentication and identity logic.
//!
//! Provides password hashing, token issuing/decoding, request identity
//! resolution, the Linux.do OAuth delegate and the login/registration
//! flows built on top of them.

pub mod identity;
pub mod jwt;
pub mod oauth;
pub mod password;
pub mod service;

use http::StatusCode;
use thiserror::Error;

/// Authentication errors.
///
/// Token failures deliberately collapse to `InvalidToken`/`Unauthorized`:
/// expired and tampered tokens are indistinguishable to the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("OAuth integration is unavailable")]
    IntegrationUnavailable,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status the transport layer should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::DuplicateUsername(_) => StatusCode::CONFLICT,
            AuthError::IntegrationUnavailable | AuthError::StorageUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AuthError::FeatureDisabled(_) => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
