//! Linux.do OAuth delegate.
//!
//! Wraps the authorization-code flow (authorize redirect, code exchange,
//! bearer-authenticated profile fetch) behind a configuration gate. State
//! (CSRF) validation and provider-token storage belong to the HTTP layer.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::AuthError;
use crate::config::OAuthConfig;
use crate::models::auth::Claims;

/// Name of the single supported provider.
pub const PROVIDER_NAME: &str = "linuxdo";

const AUTHORIZE_URL: &str = "https://connect.linux.do/oauth2/authorize";
const TOKEN_URL: &str = "https://connect.linux.do/oauth2/token";
const API_BASE_URL: &str = "https://connect.linux.do/";
const USER_INFO_PATH: &str = "api/user";

/// Provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl ProviderEndpoints {
    pub fn linuxdo() -> Self {
        Self {
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

/// Whether the delegate may be used under a given configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Open,
    /// Switched off by the operator.
    Disabled,
    /// Switched on but client id or secret is missing.
    MissingCredentials,
}

fn present(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Evaluate the gate. Pure; does not log.
pub fn oauth_gate(config: &OAuthConfig) -> GateState {
    if !config.enabled {
        GateState::Disabled
    } else if !present(config.client_id.as_ref()) || !present(config.client_secret.as_ref()) {
        GateState::MissingCredentials
    } else {
        GateState::Open
    }
}

/// Build a client for the provider, failing closed if the gate is shut.
///
/// Callers only see `IntegrationUnavailable`; the log records which of the
/// two causes applied.
pub fn get_client(config: &OAuthConfig) -> Result<OAuthClient, AuthError> {
    match oauth_gate(config) {
        GateState::Open => {}
        GateState::Disabled => {
            info!(provider = PROVIDER_NAME, "OAuth sign-in is disabled by configuration");
            return Err(AuthError::IntegrationUnavailable);
        }
        GateState::MissingCredentials => {
            warn!(
                provider = PROVIDER_NAME,
                "OAuth sign-in is enabled but client id or client secret is missing"
            );
            return Err(AuthError::IntegrationUnavailable);
        }
    }

    Ok(OAuthClient {
        client_id: config.client_id.clone().unwrap_or_default(),
        client_secret: config.client_secret.clone().unwrap_or_default(),
        scope: config.scope.clone(),
        endpoints: ProviderEndpoints::linuxdo(),
        http: reqwest::Client::new(),
    })
}

/// Generate a cryptographic state parameter (CSRF token).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Response from the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_active() -> bool {
    true
}

/// User profile returned by the provider's user-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub trust_level: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ProviderProfile {
    /// Session claims for this profile. Trust level comes straight from the
    /// provider and is not re-checked on later requests.
    pub fn claims(&self) -> Claims {
        Claims::new(self.username.clone())
            .with_trust_level(self.trust_level)
            .with_id(Some(self.id))
            .with_name(self.name.clone())
    }
}

/// State of one sign-in attempt, from redirect to fetched profile.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub state: String,
    pub redirect_uri: String,
    pub authorize_url: Url,
    pub token: Option<ProviderToken>,
    pub profile: Option<ProviderProfile>,
}

/// Configured Linux.do client.
#[derive(Clone)]
pub struct OAuthClient {
    client_id: String,
    client_secret: String,
    scope: String,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    #[cfg(test)]
    pub(crate) fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Authorize URL the browser is redirected to.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<Url, AuthError> {
        Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", self.scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| AuthError::Internal(format!("authorize url: {e}")))
    }

    /// Start a sign-in attempt with a fresh state parameter.
    pub fn begin(&self, redirect_uri: &str) -> Result<ProviderSession, AuthError> {
        let state = generate_state();
        let authorize_url = self.authorize_url(redirect_uri, &state)?;
        Ok(ProviderSession {
            state,
            redirect_uri: redirect_uri.to_string(),
            authorize_url,
            token: None,
            profile: None,
        })
    }

    /// Exchange an authorization code for a provider access token.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderToken, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];

        let resp = self
            .http
            .post(&self.endpoints.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("token exchange failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "token exchange HTTP {status}: {body}"
            )));
        }

        resp.json::<ProviderToken>()
            .await
            .map_err(|e| AuthError::Provider(format!("token response parse error: {e}")))
    }

    /// Fetch the signed-in user's profile with a provider access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AuthError> {
        let url = Url::parse(&self.endpoints.api_base_url)
            .and_then(|base| base.join(USER_INFO_PATH))
            .map_err(|e| AuthError::Internal(format!("profile url: {e}")))?;

        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("profile fetch failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "profile fetch HTTP {status}: {body}"
            )));
        }

        let profile = resp
            .json::<ProviderProfile>()
            .await
            .map_err(|e| AuthError::Provider(format!("profile parse error: {e}")))?;
        debug!(provider = PROVIDER_NAME, username = %profile.username, "fetched provider profile");
        Ok(profile)
    }

    /// Finish a sign-in attempt: exchange `code`, then fetch the profile.
    pub async fn complete(
        &self,
        mut session: ProviderSession,
        code: &str,
    ) -> Result<ProviderSession, AuthError> {
        let token = self.exchange_code(code, &session.redirect_uri).await?;
        let profile = self.fetch_profile(&token.access_token).await?;
        session.token = Some(token);
        session.profile = Some(profile);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(enabled: bool, id: Option<&str>, secret: Option<&str>) -> OAuthConfig {
        OAuthConfig {
            enabled,
            client_id: id.map(str::to_string),
            client_secret: secret.map(str::to_string),
            scope: "read".into(),
        }
    }

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn mock_endpoints(server: &MockServer) -> ProviderEndpoints {
        ProviderEndpoints {
            authorize_url: format!("{}/oauth2/authorize", server.uri()),
            token_url: format!("{}/oauth2/token", server.uri()),
            api_base_url: format!("{}/", server.uri()),
        }
    }

    fn open_client() -> OAuthClient {
        get_client(&config(true, Some("cid"), Some("csecret"))).unwrap()
    }

    #[test]
    fn gate_reports_each_state() {
        assert_eq!(oauth_gate(&config(false, Some("a"), Some("b"))), GateState::Disabled);
        assert_eq!(
            oauth_gate(&config(true, Some("a"), None)),
            GateState::MissingCredentials
        );
        assert_eq!(
            oauth_gate(&config(true, None, Some("b"))),
            GateState::MissingCredentials
        );
        assert_eq!(
            oauth_gate(&config(true, Some("a"), Some(""))),
            GateState::MissingCredentials
        );
        assert_eq!(oauth_gate(&config(true, Some("a"), Some("b"))), GateState::Open);
    }

    #[test]
    fn disabled_gate_refuses_client() {
        let err = get_client(&config(false, Some("cid"), Some("csecret"))).unwrap_err();
        assert!(matches!(err, AuthError::IntegrationUnavailable));
    }

    #[test]
    fn empty_secret_refuses_client() {
        let err = get_client(&config(true, Some("cid"), Some(""))).unwrap_err();
        assert!(matches!(err, AuthError::IntegrationUnavailable));
    }

    #[test]
    fn client_uses_fixed_linuxdo_endpoints() {
        let client = open_client();
        assert_eq!(client.endpoints(), &ProviderEndpoints::linuxdo());
        assert_eq!(client.scope(), "read");
    }

    #[test]
    fn begin_builds_authorize_url() {
        let session = open_client().begin("https://app.example/callback").unwrap();
        let url = &session.authorize_url;
        assert_eq!(url.host_str(), Some("connect.linux.do"));
        assert_eq!(url.path(), "/oauth2/authorize");

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["redirect_uri"], "https://app.example/callback");
        assert_eq!(pairs["scope"], "read");
        assert_eq!(pairs["state"], session.state);
        assert!(session.token.is_none() && session.profile.is_none());
    }

    #[test]
    fn generate_state_produces_unique_values() {
        let s1 = generate_state();
        let s2 = generate_state();
        assert_ne!(s1, s2);
        assert!(s1.len() >= 20);
    }

    #[test]
    fn debug_output_hides_client_secret() {
        let rendered = format!("{:?}", open_client());
        assert!(!rendered.contains("csecret"));
    }

    #[test]
    fn profile_claims_carry_provider_identity() {
        let profile = ProviderProfile {
            id: 77,
            username: "carol".into(),
            name: Some("Carol".into()),
            trust_level: 3,
            active: true,
        };
        let claims = profile.claims();
        assert_eq!(claims.sub, "carol");
        assert_eq!(claims.id, Some(77));
        assert_eq!(claims.trust_level, 3);
        assert_eq!(claims.name.as_deref(), Some("Carol"));
    }

    #[tokio::test]
    async fn exchange_code_posts_form_and_parses_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("client_secret=csecret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "provider-access",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let client = open_client().with_endpoints(mock_endpoints(&server));
        let token = client
            .exchange_code("the-code", "https://app.example/callback")
            .await
            .unwrap();
        assert_eq!(token.access_token, "provider-access");
        assert_eq!(token.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn exchange_code_maps_failure_status() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let client = open_client().with_endpoints(mock_endpoints(&server));
        let err = client
            .exchange_code("stale", "https://app.example/callback")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Provider(ref msg) if msg.contains("invalid_grant")));
    }

    #[tokio::test]
    async fn complete_exchanges_and_fetches_profile() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "provider-access"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/user"))
            .and(header("Authorization", "Bearer provider-access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1234,
                "username": "dave",
                "name": "Dave",
                "trust_level": 2,
                "active": true,
                "silenced": false
            })))
            .mount(&server)
            .await;

        let client = open_client().with_endpoints(mock_endpoints(&server));
        let session = client.begin("https://app.example/callback").unwrap();
        let session = client.complete(session, "the-code").await.unwrap();

        let profile = session.profile.unwrap();
        assert_eq!(profile.id, 1234);
        assert_eq!(profile.username, "dave");
        assert_eq!(profile.trust_level, 2);
        assert_eq!(session.token.unwrap().access_token, "provider-access");
    }

    #[tokio::test]
    async fn profile_fetch_rejects_unauthorized_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = open_client().with_endpoints(mock_endpoints(&server));
        let err = client.fetch_profile("revoked").await.unwrap_err();
        assert!(matches!(err, AuthError::Provider(_)));
    }
}
