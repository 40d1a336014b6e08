//! Access token lifecycle: expiry-aware refresh with a single-flight gate.

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::oauth::AuthClient;
use crate::web::session::SessionData;

/// Lead time before actual expiry during which a token is proactively refreshed.
pub const REFRESH_SKEW_SECS: i64 = 300;

/// How long a completed refresh result is handed to late arrivals holding the
/// same refresh token, instead of issuing a second refresh that could
/// invalidate the first.
const REUSE_WINDOW_SECS: i64 = 30;

/// Token lifecycle failures, mapped to HTTP 401 at the web layer.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No access token is stored in the session.
    #[error("not authenticated")]
    Unauthenticated,
    /// A refresh was attempted and failed; the session has been cleared.
    #[error("reauthentication required")]
    ReauthenticationRequired,
}

/// Whether `now` is within the skew window of (or past) the stored expiry.
///
/// Pure function of its inputs; absent expiry means "never refresh".
#[must_use]
pub fn should_refresh(now_unix: i64, expires_at: Option<i64>, skew_secs: i64) -> bool {
    let Some(expiry) = expires_at else {
        return false;
    };
    expiry.saturating_sub(skew_secs.max(0)) <= now_unix
}

/// Current Unix timestamp in seconds.
#[must_use]
pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// In-process at-most-one-refresh-in-flight guard.
///
/// The mutex is held across the refresh call, so two requests racing near
/// expiry serialize; the loser finds the winner's result (keyed by a SHA-256
/// fingerprint of the refresh token it still holds) and adopts it instead of
/// issuing a duplicate refresh.
#[derive(Default)]
pub struct RefreshGate {
    slot: Mutex<Option<CompletedRefresh>>,
}

struct CompletedRefresh {
    key: [u8; 32],
    access_token: String,
    refresh_token: Option<String>,
    expires_at: i64,
    completed_at: i64,
}

fn fingerprint(refresh_token: &str) -> [u8; 32] {
    Sha256::digest(refresh_token.as_bytes()).into()
}

/// Return a currently-valid access token, refreshing near expiry.
///
/// The session is mutated in place (token rotation, or a full clear on refresh
/// failure); the caller is responsible for persisting it afterwards.
///
/// # Errors
///
/// [`TokenError::Unauthenticated`] when no access token is stored,
/// [`TokenError::ReauthenticationRequired`] when a refresh failed and the
/// session's token fields were cleared.
pub async fn access_token(
    session: &mut SessionData,
    auth: &AuthClient,
    gate: &RefreshGate,
) -> Result<String, TokenError> {
    let Some(current) = session.access_token.clone() else {
        return Err(TokenError::Unauthenticated);
    };

    if !should_refresh(now_unix(), session.token_expires_at, REFRESH_SKEW_SECS) {
        return Ok(current);
    }

    let Some(refresh_token) = session.refresh_token.clone() else {
        // Moneybird tokens are effectively non-expiring; without a refresh
        // token the stored one is returned as-is and an upstream 401 surfaces
        // "please reconnect" instead.
        return Ok(current);
    };

    let key = fingerprint(&refresh_token);
    let mut slot = gate.slot.lock().await;

    if let Some(done) = slot.as_ref() {
        if done.key == key && now_unix().saturating_sub(done.completed_at) < REUSE_WINDOW_SECS {
            session.access_token = Some(done.access_token.clone());
            session.refresh_token = done.refresh_token.clone();
            session.token_expires_at = Some(done.expires_at);
            session.connected = true;
            return Ok(done.access_token.clone());
        }
    }

    match auth.refresh_token(&refresh_token).await {
        Ok(tokens) => {
            let now = now_unix();
            session.install_tokens(&tokens, now);
            *slot = Some(CompletedRefresh {
                key,
                access_token: tokens.access_token.clone(),
                refresh_token: session.refresh_token.clone(),
                expires_at: session.token_expires_at.unwrap_or(now),
                completed_at: now,
            });
            tracing::debug!("access token refreshed");
            Ok(tokens.access_token)
        }
        Err(e) => {
            tracing::error!(error = %e, "Token refresh failed, clearing connection");
            session.clear_connection();
            *slot = None;
            Err(TokenError::ReauthenticationRequired)
        }
    }
}
