use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::session::{
    credential_cookies, CookieChange, RequestCookies, SessionRedirect, ACCESS_TOKEN_COOKIE,
    AUTH_STATE_COOKIE, LOGIN_PATH, REFRESH_TOKEN_COOKIE,
};
use crate::{views, AppState};

const STATE_LENGTH: usize = 16;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshParams {
    redirect_to: Option<String>,
}

fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// Only local paths are resumed after a refresh.
fn safe_redirect_target(target: Option<&str>) -> &str {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.starts_with("/\\") => t,
        _ => "/",
    }
}

pub async fn login(headers: HeaderMap) -> Response {
    let cookies = RequestCookies::from_headers(&headers);
    if cookies.access_token.is_some() && cookies.refresh_token.is_some() {
        return SessionRedirect::to("/").into_response();
    }
    Html(views::login_page()).into_response()
}

pub async fn logout() -> SessionRedirect {
    SessionRedirect::to(LOGIN_PATH)
        .with(CookieChange::clear(ACCESS_TOKEN_COOKIE))
        .with(CookieChange::clear(REFRESH_TOKEN_COOKIE))
}

/// Starts the authorization-code flow with a fresh anti-CSRF state.
pub async fn authorize(State(state): State<AppState>) -> SessionRedirect {
    let auth_state = generate_state();
    let config = &state.config;
    let location = format!(
        "{}?response_type=code&client_id={}&scope={}&redirect_uri={}&state={}",
        config.authorize_url(),
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.scopes),
        urlencoding::encode(&config.redirect_uri),
        auth_state
    );
    SessionRedirect::to(location).with(CookieChange::session(AUTH_STATE_COOKIE, auth_state))
}

pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> SessionRedirect {
    let cookies = RequestCookies::from_headers(&headers);

    if let Some(error) = &params.error {
        warn!("Authorization denied: {}", error);
        return SessionRedirect::to(LOGIN_PATH);
    }
    let state_matches = match (&params.state, &cookies.auth_state) {
        (Some(received), Some(stored)) => received == stored,
        _ => false,
    };
    if !state_matches {
        warn!("Authorization callback state mismatch");
        return SessionRedirect::to(LOGIN_PATH);
    }

    // State is single-use from here on, whatever the exchange does
    let consumed = CookieChange::clear(AUTH_STATE_COOKIE);
    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        warn!("Authorization callback without code");
        return SessionRedirect::to(LOGIN_PATH).with(consumed);
    };

    match state.spotify.exchange_code(code).await {
        Ok(token) if token.refresh_token.is_some() => {
            info!("Authorization complete, installing credentials");
            SessionRedirect::to("/")
                .with(consumed)
                .with_all(credential_cookies(&token))
        }
        Ok(_) => {
            warn!("Code exchange returned no refresh token");
            SessionRedirect::to(LOGIN_PATH).with(consumed)
        }
        Err(e) => {
            warn!("Code exchange failed: {}", e);
            SessionRedirect::to(LOGIN_PATH).with(consumed)
        }
    }
}

pub async fn refresh_tokens(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RefreshParams>,
) -> SessionRedirect {
    let cookies = RequestCookies::from_headers(&headers);
    let Some(refresh_token) = cookies.refresh_token else {
        return SessionRedirect::to(LOGIN_PATH);
    };

    match state.spotify.refresh(&refresh_token).await {
        Ok(token) => {
            let target = safe_redirect_target(params.redirect_to.as_deref());
            info!("Access token refreshed, resuming {}", target);
            SessionRedirect::to(target).with_all(credential_cookies(&token))
        }
        Err(e) => {
            // The access cookie was already dropped by whoever sent us here
            warn!("Token refresh failed: {}", e);
            SessionRedirect::to(LOGIN_PATH).with(CookieChange::clear(REFRESH_TOKEN_COOKIE))
        }
    }
}

/// Hands the access token to the browser-side playback widget.
pub async fn access_token(headers: HeaderMap) -> Response {
    match RequestCookies::from_headers(&headers).access_token {
        Some(token) => Json(json!({ "access_token": token })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response(),
    }
}
