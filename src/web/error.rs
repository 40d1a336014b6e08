//! Two error channels, matching the two kinds of entry points: OAuth-flow
//! outcomes become redirects carrying a short code for the connect page, API
//! failures become HTTP status + JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;

use crate::token::TokenError;

/// OAuth-flow outcomes surfaced as `/connect?error=<code>` redirects.
///
/// Never rendered as a raw error to the user; the connect page maps the code
/// to a human message.
#[derive(Debug)]
pub enum ConnectError {
    /// Error code passed through from the provider redirect.
    Provider(String),
    MissingCode,
    InvalidState,
    TokenExchangeFailed,
    AuthenticationFailed,
}

impl ConnectError {
    fn code(&self) -> &str {
        match self {
            Self::Provider(code) => code,
            Self::MissingCode => "missing_code",
            Self::InvalidState => "invalid_state",
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::AuthenticationFailed => "authentication_failed",
        }
    }
}

impl IntoResponse for ConnectError {
    fn into_response(self) -> Response {
        let encoded = urlencoding::encode(self.code());
        Redirect::to(&format!("/connect?error={encoded}")).into_response()
    }
}

/// JSON-channel errors for the API endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated with Moneybird")]
    Unauthenticated,
    #[error("Authentication expired, please reconnect")]
    ReauthenticationRequired,
    /// Upstream returned a non-success status.
    #[error("upstream request failed with status {0}")]
    Upstream(u16),
    #[error("{0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthenticated | Self::ReauthenticationRequired => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            // A stale token slipping past the skew window comes back as an
            // upstream 401; surface it as "reconnect" rather than a gateway error.
            Self::Upstream(401) => (
                StatusCode::UNAUTHORIZED,
                "Authentication expired, please reconnect".to_string(),
            ),
            Self::Upstream(upstream_status) => {
                tracing::warn!(status = upstream_status, "Upstream request failed");
                (StatusCode::BAD_GATEWAY, "Upstream request failed".to_string())
            }
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "API internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Unauthenticated => Self::Unauthenticated,
            TokenError::ReauthenticationRequired => Self::ReauthenticationRequired,
        }
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Provider { status, .. } => Self::Upstream(status),
            other => Self::Internal(other.to_string()),
        }
    }
}
