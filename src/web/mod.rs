//! HTTP surface: shared state, router, session cookie, and handlers.

pub mod error;
pub mod routes;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::Key;

use crate::config::AppConfig;
use crate::error::Error;
use crate::moneybird::ApiClient;
use crate::oauth::AuthClient;
use crate::token::RefreshGate;

/// Upper bound on any single outbound call to Moneybird; a hung upstream
/// never blocks a request indefinitely.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) auth: Arc<AuthClient>,
    pub(crate) api: Arc<ApiClient>,
    pub(crate) gate: Arc<RefreshGate>,
}

impl AppState {
    /// Build runtime state from configuration.
    ///
    /// One HTTP client with a fixed upstream timeout is shared by the OAuth
    /// and API clients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?;
        let auth = AuthClient::new(config.oauth.clone()).with_http_client(http.clone());
        let api = ApiClient::new(config.api_base.clone()).with_http_client(http);
        Ok(Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            api: Arc::new(api),
            gate: Arc::new(RefreshGate::default()),
        })
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.config.cookie_key.clone()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/auth/moneybird/initiate", get(routes::initiate))
        .route("/api/auth/moneybird/callback", get(routes::callback))
        .route("/api/auth/moneybird/select-admin", post(routes::select_admin))
        .route(
            "/api/auth/moneybird/disconnect",
            get(routes::disconnect).post(routes::disconnect),
        )
        .route("/api/moneybird/administrations", get(routes::administrations))
        .route("/api/moneybird/invoices", get(routes::invoices))
        .route("/api/tokenize", post(routes::tokenize))
        .route("/api/debug/env", get(routes::debug_env))
        .with_state(state)
}
