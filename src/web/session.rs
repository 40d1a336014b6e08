//! Cookie-backed session: the server's only per-user state.
//!
//! The whole session serializes as JSON into one encrypted, http-only cookie;
//! load, mutate, and persist are distinct steps so handlers never touch
//! ambient state.

use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::types::TokenResponse;

/// Name of the encrypted session cookie.
pub const SESSION_COOKIE: &str = "liquidify-session";

const SESSION_TTL_DAYS: i64 = 7;

/// Horizon applied when the provider omits `expires_in`. Moneybird tokens
/// currently do not expire; an expiry is tracked anyway.
const FALLBACK_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Per-user connection state, owned by the browser's cookie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute token expiry, epoch seconds.
    pub token_expires_at: Option<i64>,
    pub connected: bool,
    /// Transient CSRF nonce, set on initiate and consumed on callback.
    pub oauth_state: Option<String>,
    pub administration_id: Option<String>,
    pub administration_name: Option<String>,
}

impl SessionData {
    /// Load the session from the cookie jar, defaulting on absence or a
    /// cookie that fails to decode.
    #[must_use]
    pub fn load(jar: &PrivateCookieJar) -> Self {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
            .unwrap_or_default()
    }

    /// Write the session back into the jar as a fresh cookie.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the session cannot be encoded.
    pub fn persist(
        &self,
        jar: PrivateCookieJar,
        secure: bool,
    ) -> Result<PrivateCookieJar, serde_json::Error> {
        let value = serde_json::to_string(self)?;
        let cookie = Cookie::build((SESSION_COOKIE, value))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::days(SESSION_TTL_DAYS))
            .build();
        Ok(jar.add(cookie))
    }

    /// Remove the session cookie entirely (disconnect).
    #[must_use]
    pub fn remove(jar: PrivateCookieJar) -> PrivateCookieJar {
        let cookie = Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .max_age(Duration::ZERO)
            .build();
        jar.remove(cookie)
    }

    /// Install a token exchange or refresh result atomically with its
    /// computed absolute expiry.
    ///
    /// A refresh response that omits the refresh token retains the previous
    /// one instead of dropping it.
    pub fn install_tokens(&mut self, tokens: &TokenResponse, now_unix: i64) {
        let ttl = tokens
            .expires_in
            .map_or(FALLBACK_TOKEN_TTL_SECS, |secs| secs as i64);
        self.access_token = Some(tokens.access_token.clone());
        if let Some(refresh_token) = &tokens.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
        self.token_expires_at = Some(now_unix + ttl);
        self.connected = true;
    }

    /// Clear all credential fields and the connected flag in one operation.
    ///
    /// The administration choice is kept; reconnecting resumes where the
    /// user left off.
    pub fn clear_connection(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.token_expires_at = None;
        self.connected = false;
    }
}
