//! Login and registration flows composed from the auth components.

use std::sync::{Arc, LazyLock};

use tracing::info;

use super::AuthError;
use super::identity::IdentityResolver;
use super::jwt::TokenCodec;
use super::oauth::{self, OAuthClient, ProviderProfile};
use super::password::{hash_password, verify_password};
use crate::config::AuthConfig;
use crate::models::auth::{AccountRecord, Claims, IssuedToken, NewAccount};
use crate::store::AccountStore;

/// Hash checked when the username is unknown, so that path costs the same
/// bcrypt round as a wrong password.
static UNKNOWN_USER_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("warden-unknown-user").ok());

/// Verify `password` against `stored_hash`, or against [`UNKNOWN_USER_HASH`]
/// when there is no account. The latter never succeeds.
fn check_password(password: &str, stored_hash: Option<&str>) -> bool {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(hash) = UNKNOWN_USER_HASH.as_deref() {
                std::hint::black_box(verify_password(password, hash));
            }
            false
        }
    }
}

/// Authentication service shared by all request handlers.
#[derive(Clone)]
pub struct AuthService {
    config: Arc<AuthConfig>,
    store: Arc<dyn AccountStore>,
    codec: TokenCodec,
}

impl AuthService {
    pub fn new(config: AuthConfig, store: Arc<dyn AccountStore>) -> Self {
        let codec = TokenCodec::from_config(&config);
        Self {
            config: Arc::new(config),
            store,
            codec,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn resolver(&self) -> IdentityResolver {
        IdentityResolver::new(self.codec.clone())
    }

    /// Linux.do client, if the integration is enabled and configured.
    pub fn oauth_client(&self) -> Result<OAuthClient, AuthError> {
        oauth::get_client(&self.config.oauth)
    }

    /// Register a local account with trust level 0.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AccountRecord, AuthError> {
        if !self.config.enable_local_registration {
            return Err(AuthError::FeatureDisabled("local registration"));
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::Validation("username must not be empty".into()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password must not be empty".into()));
        }

        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task: {e}")))??;

        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let account = self
            .store
            .create(NewAccount::new(username, password_hash).with_display_name(display_name))
            .await?;

        info!(username = %account.username, id = account.id, "registered local account");
        Ok(account)
    }

    /// Authenticate a local account and issue a session token.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        if !self.config.enable_local_login {
            return Err(AuthError::FeatureDisabled("local login"));
        }

        let account = self.store.find_by_username(username.trim()).await?;

        let password = password.to_owned();
        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());
        let verified =
            tokio::task::spawn_blocking(move || check_password(&password, stored_hash.as_deref()))
                .await
                .map_err(|e| AuthError::Internal(format!("verify task: {e}")))?;
        let Some(account) = account.filter(|_| verified) else {
            return Err(AuthError::InvalidCredentials);
        };

        info!(username = %account.username, "local login succeeded");
        self.issue(&Claims::from(&account))
    }

    /// Issue a session token for a profile fetched from Linux.do.
    pub fn login_with_provider(&self, profile: &ProviderProfile) -> Result<IssuedToken, AuthError> {
        info!(
            provider = oauth::PROVIDER_NAME,
            username = %profile.username,
            "provider login succeeded"
        );
        self.issue(&profile.claims())
    }

    fn issue(&self, claims: &Claims) -> Result<IssuedToken, AuthError> {
        let ttl = self.codec.default_ttl();
        let access_token = self.codec.issue(claims, Some(ttl))?;
        Ok(IssuedToken {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: ttl.num_seconds(),
        })
    }
}
