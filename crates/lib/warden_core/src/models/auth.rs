//! Authentication domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A locally registered account as stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub trust_level: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a new account. The id and creation time are
/// assigned by the storage engine.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub trust_level: i64,
}

impl NewAccount {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            display_name: None,
            trust_level: 0,
        }
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name;
        self
    }

    pub fn with_trust_level(mut self, trust_level: i64) -> Self {
        self.trust_level = trust_level;
        self
    }
}

/// Identity claims carried by a session token, before expiry is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — local username or provider username.
    pub sub: String,
    /// Trust tier; absent claims decode as 0.
    #[serde(default)]
    pub trust_level: i64,
    /// External provider's numeric user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Any further claims, round-tripped untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            trust_level: 0,
            id: None,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn with_trust_level(mut self, trust_level: i64) -> Self {
        self.trust_level = trust_level;
        self
    }

    pub fn with_id(mut self, id: Option<i64>) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Local accounts leave `id` unset; that claim only ever holds a provider id.
impl From<&AccountRecord> for Claims {
    fn from(account: &AccountRecord) -> Self {
        Claims::new(account.username.clone())
            .with_trust_level(account.trust_level)
            .with_name(account.display_name.clone())
    }
}

/// Decoded token payload: the identity claims plus the enforced expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub claims: Claims,
    /// Expiry (unix timestamp, seconds).
    pub exp: i64,
}

/// Request-scoped identity of the caller. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    pub username: String,
    pub trust_level: i64,
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl From<Claims> for CallerIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            trust_level: claims.trust_level,
            id: claims.id,
            name: claims.name,
        }
    }
}

/// Token handed back to the transport layer after a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}
