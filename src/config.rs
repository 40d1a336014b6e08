use std::net::SocketAddr;

use axum_extra::extract::cookie::Key;
use url::Url;

use crate::error::Error;
use crate::oauth::OAuthConfig;

const DEFAULT_BASE_URL: &str = "https://moneybird.com";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Application configuration, loaded once at startup.
pub struct AppConfig {
    /// OAuth2 client settings and endpoints.
    pub oauth: OAuthConfig,
    /// Base URL for the Moneybird v2 REST API.
    pub api_base: Url,
    /// Key encrypting the session cookie.
    pub cookie_key: Key,
    /// Whether session cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
    /// Bind address for the HTTP server.
    pub listen_addr: SocketAddr,
}

impl AppConfig {
    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `MONEYBIRD_CLIENT_ID`: OAuth2 client ID
    /// - `MONEYBIRD_CLIENT_SECRET`: OAuth2 client secret
    /// - `MONEYBIRD_REDIRECT_URI`: OAuth2 callback URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `MONEYBIRD_BASE_URL`: Provider base; authorize/token/API endpoints derive from it
    /// - `MONEYBIRD_AUTH_URL`: Override the authorize endpoint
    /// - `MONEYBIRD_TOKEN_URL`: Override the token endpoint
    /// - `MONEYBIRD_SCOPES`: Comma-separated OAuth2 scopes
    /// - `SESSION_SECRET`: Cookie encryption key bytes (at least 64)
    /// - `DEV_MODE`: Set to `"1"` or `"true"` to disable secure cookies
    /// - `LISTEN_ADDR`: Bind address, default `0.0.0.0:3000`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, Error> {
        let client_id = require("MONEYBIRD_CLIENT_ID")?;
        let client_secret = require("MONEYBIRD_CLIENT_SECRET")?;
        let redirect_uri: Url = require("MONEYBIRD_REDIRECT_URI")?
            .parse()
            .map_err(|e| Error::Config(format!("MONEYBIRD_REDIRECT_URI: {e}")))?;

        let base: Url = match std::env::var("MONEYBIRD_BASE_URL") {
            Ok(s) => s
                .parse()
                .map_err(|e| Error::Config(format!("MONEYBIRD_BASE_URL: {e}")))?,
            Err(_) => DEFAULT_BASE_URL.parse().expect("valid default URL"),
        };

        let mut oauth = OAuthConfig::new(client_id, client_secret, redirect_uri)
            .with_auth_url(endpoint(&base, "oauth/authorize")?)
            .with_token_url(endpoint(&base, "oauth/token")?);

        if let Ok(url_str) = std::env::var("MONEYBIRD_AUTH_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("MONEYBIRD_AUTH_URL: {e}")))?;
            oauth = oauth.with_auth_url(url);
        }
        if let Ok(url_str) = std::env::var("MONEYBIRD_TOKEN_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("MONEYBIRD_TOKEN_URL: {e}")))?;
            oauth = oauth.with_token_url(url);
        }
        if let Ok(scopes) = std::env::var("MONEYBIRD_SCOPES") {
            oauth = oauth.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
        }

        let api_base = endpoint(&base, "api/v2")?;

        let dev_mode = matches!(std::env::var("DEV_MODE").as_deref(), Ok("1") | Ok("true"));

        let cookie_key = match std::env::var("SESSION_SECRET") {
            Ok(secret) => Key::try_from(secret.as_bytes()).map_err(|_| {
                Error::Config(
                    "SESSION_SECRET is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid secret."
                        .into(),
                )
            })?,
            Err(_) => Key::generate(),
        };

        let listen_addr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.into())
            .parse()
            .map_err(|e| Error::Config(format!("LISTEN_ADDR: {e}")))?;

        Ok(Self {
            oauth,
            api_base,
            cookie_key,
            secure_cookies: !dev_mode,
            listen_addr,
        })
    }
}

fn require(name: &'static str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::Config(format!("{name} is required")))
}

fn endpoint(base: &Url, path: &str) -> Result<Url, Error> {
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    joined
        .parse()
        .map_err(|e| Error::Config(format!("derived endpoint {joined}: {e}")))
}
