use url::Url;

use crate::csrf;
use crate::error::Error;
use crate::types::TokenResponse;

/// Moneybird `OAuth2` configuration.
///
/// Required fields are constructor parameters — no runtime "missing field" errors.
///
/// ```rust,ignore
/// use liquidify::OAuthConfig;
///
/// let config = OAuthConfig::new("my-client-id", "my-secret", "https://my-app.com/callback".parse()?);
/// // Optional overrides via chaining:
/// let config = config
///     .with_auth_url("https://custom.example.com/authorize".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create a new OAuth2 configuration with the Moneybird default endpoints.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            auth_url: "https://moneybird.com/oauth/authorize"
                .parse()
                .expect("valid default URL"),
            token_url: "https://moneybird.com/oauth/token"
                .parse()
                .expect("valid default URL"),
            scopes: vec!["sales_invoices".into(), "settings".into()],
        }
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the OAuth2 scopes (default: `["sales_invoices", "settings"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authorization endpoint URL.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Token exchange endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// `OAuth2` redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Requested `OAuth2` scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// `OAuth2` authorization client for Moneybird.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

/// Authorization URL with the CSRF state to store in the session.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

impl AuthClient {
    /// Create a new Moneybird auth client.
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Generate an authorization URL with a fresh CSRF state parameter.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let state = csrf::generate_state();
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("state", &state)
            .append_pair("scope", &scope);

        AuthorizationRequest {
            url: url.into(),
            state,
        }
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Provider`] if the token endpoint returns an error.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let response = ensure_success(response, "token exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Request a new access token using a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Provider`] if the token endpoint rejects the refresh.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let response = ensure_success(response, "token refresh").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }
}

/// Checks HTTP response status; returns the response on success or an error with details.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();
    Err(Error::Provider {
        operation,
        status,
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tokio::runtime::Runtime;

    fn runtime() -> Runtime {
        Runtime::new().unwrap()
    }

    fn test_config() -> OAuthConfig {
        OAuthConfig::new(
            "test-client",
            "test-secret",
            "https://example.com/callback".parse().unwrap(),
        )
    }

    #[test]
    fn test_authorization_url_contains_state() {
        let client = AuthClient::new(test_config());
        let req = client.authorization_url();

        assert!(req.url.contains("state="));
        assert!(req.url.contains("response_type=code"));
        assert!(req.url.contains("client_id=test-client"));
        assert!(req.url.contains("scope=sales_invoices+settings"));
        assert!(!req.state.is_empty());
        assert!(req.url.contains(&req.state));
    }

    #[test]
    fn test_authorization_url_unique_per_call() {
        let client = AuthClient::new(test_config());
        let req1 = client.authorization_url();
        let req2 = client.authorization_url();

        assert_ne!(req1.state, req2.state);
    }

    #[test]
    fn test_config_constructor() {
        let config = test_config();

        assert_eq!(config.client_id(), "test-client");
        assert_eq!(config.redirect_uri().as_str(), "https://example.com/callback");
        assert_eq!(
            config.auth_url().as_str(),
            "https://moneybird.com/oauth/authorize"
        );
        assert_eq!(
            config.token_url().as_str(),
            "https://moneybird.com/oauth/token"
        );
    }

    #[test]
    fn test_config_with_overrides() {
        let config = test_config()
            .with_auth_url("https://custom.example.com/authorize".parse().unwrap())
            .with_scopes(vec!["sales_invoices".into()]);

        assert_eq!(
            config.auth_url().as_str(),
            "https://custom.example.com/authorize"
        );
        assert_eq!(config.scopes(), &["sales_invoices"]);
    }

    #[test]
    fn exchange_code_success() {
        let rt = runtime();
        rt.block_on(async {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/oauth/token")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body_contains("grant_type=authorization_code")
                    .body_contains("code=code123")
                    .body_contains("client_secret=test-secret");
                then.status(200).json_body_obj(&serde_json::json!({
                    "access_token": "abc123",
                    "refresh_token": "refresh456",
                    "token_type": "bearer",
                    "expires_in": 3600,
                    "scope": "sales_invoices settings"
                }));
            });

            let config =
                test_config().with_token_url(server.url("/oauth/token").parse().unwrap());
            let client = AuthClient::new(config);

            let tokens = client.exchange_code("code123").await.unwrap();
            mock.assert();
            assert_eq!(tokens.access_token, "abc123");
            assert_eq!(tokens.refresh_token.as_deref(), Some("refresh456"));
            assert_eq!(tokens.expires_in, Some(3600));
        });
    }

    #[test]
    fn exchange_code_failure_carries_status_and_body() {
        let rt = runtime();
        rt.block_on(async {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/oauth/token");
                then.status(400).body("invalid_grant");
            });

            let config =
                test_config().with_token_url(server.url("/oauth/token").parse().unwrap());
            let client = AuthClient::new(config);

            let err = client.exchange_code("bad-code").await.unwrap_err();
            match err {
                Error::Provider {
                    operation,
                    status,
                    detail,
                } => {
                    assert_eq!(operation, "token exchange");
                    assert_eq!(status, 400);
                    assert_eq!(detail, "invalid_grant");
                }
                other => panic!("expected Provider error, got {other:?}"),
            }
        });
    }

    #[test]
    fn refresh_sends_refresh_grant() {
        let rt = runtime();
        rt.block_on(async {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/oauth/token")
                    .body_contains("grant_type=refresh_token")
                    .body_contains("refresh_token=refresh456");
                then.status(200).json_body_obj(&serde_json::json!({
                    "access_token": "new-access",
                    "token_type": "bearer",
                    "expires_in": 7200
                }));
            });

            let config =
                test_config().with_token_url(server.url("/oauth/token").parse().unwrap());
            let client = AuthClient::new(config);

            let tokens = client.refresh_token("refresh456").await.unwrap();
            mock.assert();
            assert_eq!(tokens.access_token, "new-access");
            // Moneybird may omit the refresh token on renewal; the session
            // layer retains the previous one in that case.
            assert!(tokens.refresh_token.is_none());
        });
    }
}
