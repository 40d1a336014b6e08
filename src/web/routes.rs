use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, ConnectError};
use super::session::SessionData;
use super::AppState;
use crate::token;
use crate::types::AdministrationId;

// ── Health ─────────────────────────────────────────────────────────

pub(crate) async fn health() -> &'static str {
    "ok"
}

// ── Initiate ───────────────────────────────────────────────────────

pub(crate) async fn initiate(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let auth_req = state.auth.authorization_url();

    let mut session = SessionData::load(&jar);
    session.oauth_state = Some(auth_req.state);

    match session.persist(jar, state.config.secure_cookies) {
        Ok(jar) => (jar, Redirect::to(&auth_req.url)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to persist session during OAuth initiation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to initiate Moneybird authentication" })),
            )
                .into_response()
        }
    }
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub(crate) async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth2 error from Moneybird");
        return ConnectError::Provider(error).into_response();
    }

    let Some(code) = params.code else {
        tracing::warn!("OAuth2 callback without a code");
        return ConnectError::MissingCode.into_response();
    };

    let mut session = SessionData::load(&jar);
    // The stored nonce is single-use: taken (and thereby cleared) before the
    // comparison, on match and mismatch alike.
    let stored_state = session.oauth_state.take();

    let state_matches = matches!(
        (params.state.as_deref(), stored_state.as_deref()),
        (Some(received), Some(stored)) if received == stored
    );
    if !state_matches {
        tracing::warn!("OAuth state mismatch");
        return match session.persist(jar, state.config.secure_cookies) {
            Ok(jar) => (jar, ConnectError::InvalidState).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist session after state mismatch");
                ConnectError::AuthenticationFailed.into_response()
            }
        };
    }

    match state.auth.exchange_code(&code).await {
        Ok(tokens) => {
            session.install_tokens(&tokens, token::now_unix());
            tracing::info!(
                has_refresh_token = tokens.refresh_token.is_some(),
                expires_in = ?tokens.expires_in,
                "Moneybird token exchange successful"
            );
            match session.persist(jar, state.config.secure_cookies) {
                Ok(jar) => (jar, Redirect::to("/connect?step=select-admin")).into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist session after token exchange");
                    ConnectError::AuthenticationFailed.into_response()
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Token exchange failed");
            match session.persist(jar, state.config.secure_cookies) {
                Ok(jar) => (jar, ConnectError::TokenExchangeFailed).into_response(),
                Err(_) => ConnectError::TokenExchangeFailed.into_response(),
            }
        }
    }
}

// ── Select administration ──────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectAdminBody {
    #[serde(default)]
    administration_id: Option<String>,
    #[serde(default)]
    administration_name: Option<String>,
}

pub(crate) async fn select_admin(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(body): Json<SelectAdminBody>,
) -> Result<(PrivateCookieJar, Json<serde_json::Value>), ApiError> {
    let mut session = SessionData::load(&jar);
    if !session.connected || session.access_token.is_none() {
        return Err(ApiError::Unauthenticated);
    }

    let administration_id = body
        .administration_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("Administration ID and name are required".into()))?;
    let administration_name = body
        .administration_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("Administration ID and name are required".into()))?;

    session.administration_id = Some(administration_id.clone());
    session.administration_name = Some(administration_name.clone());
    let jar = session
        .persist(jar, state.config.secure_cookies)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(administration_id = %administration_id, "Administration selected");

    Ok((
        jar,
        Json(json!({
            "success": true,
            "administrationId": administration_id,
            "administrationName": administration_name,
        })),
    ))
}

// ── Disconnect ─────────────────────────────────────────────────────

pub(crate) async fn disconnect(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (SessionData::remove(jar), Redirect::to("/connect"))
}

// ── Moneybird reads ────────────────────────────────────────────────

pub(crate) async fn administrations(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Response {
    let mut session = SessionData::load(&jar);
    if !session.connected || session.access_token.is_none() {
        return ApiError::Unauthenticated.into_response();
    }

    let token = token::access_token(&mut session, &state.auth, &state.gate).await;
    // The refresh may have rotated or cleared the stored tokens; persist either way.
    let jar = match session.persist(jar, state.config.secure_cookies) {
        Ok(jar) => jar,
        Err(e) => return ApiError::Internal(e.to_string()).into_response(),
    };
    let token = match token {
        Ok(token) => token,
        Err(e) => return (jar, ApiError::from(e)).into_response(),
    };

    match state.api.list_administrations(&token).await {
        Ok(administrations) => (jar, Json(administrations)).into_response(),
        Err(e) => (jar, ApiError::from(e)).into_response(),
    }
}

pub(crate) async fn invoices(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut session = SessionData::load(&jar);
    if !session.connected || session.access_token.is_none() {
        return ApiError::Unauthenticated.into_response();
    }
    let Some(administration_id) = session.administration_id.clone() else {
        return ApiError::Validation("No administration selected".into()).into_response();
    };

    let token = token::access_token(&mut session, &state.auth, &state.gate).await;
    let jar = match session.persist(jar, state.config.secure_cookies) {
        Ok(jar) => jar,
        Err(e) => return ApiError::Internal(e.to_string()).into_response(),
    };
    let token = match token {
        Ok(token) => token,
        Err(e) => return (jar, ApiError::from(e)).into_response(),
    };

    let administration_id = AdministrationId::from(administration_id);
    match state.api.list_open_invoices(&token, &administration_id).await {
        Ok(invoices) => (jar, Json(invoices)).into_response(),
        Err(e) => (jar, ApiError::from(e)).into_response(),
    }
}

// ── Tokenize (stub) ────────────────────────────────────────────────

pub(crate) async fn tokenize() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "error": "Not Implemented",
            "message": "Tokenization feature will be implemented in a future sprint",
        })),
    )
}

// ── Debug ──────────────────────────────────────────────────────────

pub(crate) async fn debug_env(State(state): State<AppState>) -> Json<serde_json::Value> {
    // Client secret presence only; client id masked like any credential.
    Json(json!({
        "clientId": mask_token(state.config.oauth.client_id()),
        "clientSecret": "SET",
        "redirectUri": state.config.oauth.redirect_uri().as_str(),
        "authUrl": state.config.oauth.auth_url().as_str(),
        "apiBase": state.config.api_base.as_str(),
        "secureCookies": state.config.secure_cookies,
    }))
}

// ── Helpers ────────────────────────────────────────────────────────

const TOKEN_MASK_PREFIX_LEN: usize = 6;
const TOKEN_MASK_SUFFIX_LEN: usize = 4;

fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let len = trimmed.len();
    if len <= TOKEN_MASK_PREFIX_LEN + TOKEN_MASK_SUFFIX_LEN {
        return "*".repeat(len.min(8));
    }

    let prefix = &trimmed[..TOKEN_MASK_PREFIX_LEN];
    let suffix = &trimmed[len - TOKEN_MASK_SUFFIX_LEN..];
    format!("{prefix}...{suffix}")
}
