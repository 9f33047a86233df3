//! Authentication settings.
//!
//! Built once at startup and passed by reference to the components that
//! need it; nothing here is global or mutable.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Default token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 15;

/// Default store location: an SQLite file in the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./warden.db";

/// Default OAuth scope requested from Linux.do.
pub const DEFAULT_OAUTH_SCOPE: &str = "read";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Linux.do OAuth client settings.
#[derive(Clone, Default)]
pub struct OAuthConfig {
    pub enabled: bool,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("enabled", &self.enabled)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// Settings consumed by the auth core.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC signing secret. Rotating it invalidates every issued token.
    pub secret_key: String,
    /// Signing algorithm (HMAC family).
    pub algorithm: Algorithm,
    /// Lifetime applied when a token is issued without an explicit ttl.
    pub access_token_ttl: Duration,
    /// Account store connection URL (`sqlite:` or `mysql:`).
    pub database_url: String,
    pub oauth: OAuthConfig,
    pub enable_local_login: bool,
    pub enable_local_registration: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("database_url", &self.database_url)
            .field("oauth", &self.oauth)
            .field("enable_local_login", &self.enable_local_login)
            .field("enable_local_registration", &self.enable_local_registration)
            .finish()
    }
}

impl AuthConfig {
    /// Config with the given secret and every other setting at its default.
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            algorithm: Algorithm::HS256,
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            oauth: OAuthConfig {
                enabled: true,
                client_id: None,
                client_secret: None,
                scope: DEFAULT_OAUTH_SCOPE.to_string(),
            },
            enable_local_login: true,
            enable_local_registration: true,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                        | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `SECRET_KEY`                    | required                |
    /// | `ALGORITHM`                     | `HS256`                 |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES`   | `15`                    |
    /// | `DATABASE_URL`                  | `sqlite://./warden.db`  |
    /// | `ENABLE_LINUXDO_OAUTH`          | `true`                  |
    /// | `LINUXDO_CLIENT_ID`             | unset                   |
    /// | `LINUXDO_CLIENT_SECRET`         | unset                   |
    /// | `LINUXDO_SCOPE`                 | `read`                  |
    /// | `ENABLE_LOCAL_LOGIN`            | `true`                  |
    /// | `ENABLE_LOCAL_REGISTRATION`     | `true`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret_key = get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;
        let mut config = Self::with_secret(secret_key);

        if let Some(alg) = get("ALGORITHM") {
            config.algorithm = parse_algorithm(&alg)?;
        }
        if let Some(minutes) = get("ACCESS_TOKEN_EXPIRE_MINUTES") {
            config.access_token_ttl = parse_minutes(&minutes)?;
        }
        if let Some(url) = get("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(flag) = get("ENABLE_LINUXDO_OAUTH") {
            config.oauth.enabled = parse_bool("ENABLE_LINUXDO_OAUTH", &flag)?;
        }
        config.oauth.client_id = get("LINUXDO_CLIENT_ID");
        config.oauth.client_secret = get("LINUXDO_CLIENT_SECRET");
        if let Some(scope) = get("LINUXDO_SCOPE") {
            config.oauth.scope = scope;
        }
        if let Some(flag) = get("ENABLE_LOCAL_LOGIN") {
            config.enable_local_login = parse_bool("ENABLE_LOCAL_LOGIN", &flag)?;
        }
        if let Some(flag) = get("ENABLE_LOCAL_REGISTRATION") {
            config.enable_local_registration = parse_bool("ENABLE_LOCAL_REGISTRATION", &flag)?;
        }

        Ok(config)
    }
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "ALGORITHM",
        reason,
    };
    let alg = Algorithm::from_str(value.trim()).map_err(|e| invalid(e.to_string()))?;
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
        other => Err(invalid(format!("{other:?} is not an HMAC algorithm"))),
    }
}

fn parse_minutes(value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|minutes| *minutes > 0)
        .and_then(Duration::try_minutes)
        .ok_or_else(|| ConfigError::Invalid {
            var: "ACCESS_TOKEN_EXPIRE_MINUTES",
            reason: format!("expected a positive number of minutes, got '{value}'"),
        })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
