//! Cookie-backed credentials and the gate in front of every protected route.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::REFRESH_TOKEN_MAX_AGE;
use crate::spotify::{SpotifyError, TokenResponse};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const AUTH_STATE_COOKIE: &str = "spotify_auth_state";

pub const LOGIN_PATH: &str = "/login";
pub const AUTH_PATH: &str = "/auth";
pub const REFRESH_PATH: &str = "/auth/refresh_tokens";

/// Credentials the browser sent with this request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestCookies {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub auth_state: Option<String>,
}

impl RequestCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::default();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let Some((name, val)) = pair.trim().split_once('=') else {
                    continue;
                };
                let val = val.trim();
                if val.is_empty() {
                    continue;
                }
                let val = urlencoding::decode(val)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| val.to_string());
                match name.trim() {
                    ACCESS_TOKEN_COOKIE => cookies.access_token = Some(val),
                    REFRESH_TOKEN_COOKIE => cookies.refresh_token = Some(val),
                    AUTH_STATE_COOKIE => cookies.auth_state = Some(val),
                    _ => {}
                }
            }
        }
        cookies
    }
}

/// A single `Set-Cookie` mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum CookieChange {
    Set {
        name: &'static str,
        value: String,
        max_age: Option<Duration>,
    },
    Clear {
        name: &'static str,
    },
}

impl CookieChange {
    pub fn set(name: &'static str, value: impl Into<String>, max_age: Duration) -> Self {
        CookieChange::Set {
            name,
            value: value.into(),
            max_age: Some(max_age),
        }
    }

    /// Cookie without Max-Age: lives for the browser session.
    pub fn session(name: &'static str, value: impl Into<String>) -> Self {
        CookieChange::Set {
            name,
            value: value.into(),
            max_age: None,
        }
    }

    pub fn clear(name: &'static str) -> Self {
        CookieChange::Clear { name }
    }

    pub fn header_value(&self) -> String {
        match self {
            CookieChange::Set {
                name,
                value,
                max_age: Some(max_age),
            } => format!(
                "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
                name,
                urlencoding::encode(value),
                max_age.as_secs()
            ),
            CookieChange::Set {
                name,
                value,
                max_age: None,
            } => format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                name,
                urlencoding::encode(value)
            ),
            CookieChange::Clear { name } => format!(
                "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/",
                name
            ),
        }
    }
}

/// Cookie changes that installing a freshly issued token pair requires.
///
/// The access cookie follows `expires_in`; the refresh cookie gets the fixed
/// week regardless of what the upstream grants, and is only rewritten when
/// the upstream actually issued one.
pub fn credential_cookies(token: &TokenResponse) -> Vec<CookieChange> {
    let mut changes = vec![CookieChange::set(
        ACCESS_TOKEN_COOKIE,
        token.access_token.clone(),
        Duration::from_secs(token.expires_in),
    )];
    if let Some(refresh) = &token.refresh_token {
        changes.push(CookieChange::set(
            REFRESH_TOKEN_COOKIE,
            refresh.clone(),
            REFRESH_TOKEN_MAX_AGE,
        ));
    }
    changes
}

/// A redirect that also mutates cookies. Every failure path ends in one.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRedirect {
    pub location: String,
    pub cookies: Vec<CookieChange>,
}

impl SessionRedirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            cookies: Vec::new(),
        }
    }

    pub fn with(mut self, change: CookieChange) -> Self {
        self.cookies.push(change);
        self
    }

    pub fn with_all(mut self, changes: impl IntoIterator<Item = CookieChange>) -> Self {
        self.cookies.extend(changes);
        self
    }
}

impl IntoResponse for SessionRedirect {
    fn into_response(self) -> Response {
        let mut response = StatusCode::FOUND.into_response();
        let headers = response.headers_mut();
        match HeaderValue::from_str(&self.location) {
            Ok(location) => {
                headers.insert(header::LOCATION, location);
            }
            Err(_) => {
                warn!("Refusing to redirect to unencodable location {:?}", self.location);
                headers.insert(header::LOCATION, HeaderValue::from_static(LOGIN_PATH));
            }
        }
        for change in &self.cookies {
            if let Ok(value) = HeaderValue::from_str(&change.header_value()) {
                headers.append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

/// `/auth/refresh_tokens?redirect_to=<url>` for resuming `original_url`.
pub fn refresh_redirect_location(original_url: &str) -> String {
    format!(
        "{}?redirect_to={}",
        REFRESH_PATH,
        urlencoding::encode(original_url)
    )
}

/// What the gate does with a request, given which credentials are present.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    Login,
    Authorize,
    Refresh { location: String },
    Proceed(Session),
}

/// Request-scoped credentials for protected handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn decide(cookies: &RequestCookies, original_url: &str) -> AuthDecision {
    match (&cookies.access_token, &cookies.refresh_token) {
        (None, None) => AuthDecision::Login,
        // Should not happen: the refresh cookie always outlives the access cookie.
        (Some(_), None) => AuthDecision::Authorize,
        (None, Some(_)) => AuthDecision::Refresh {
            location: refresh_redirect_location(original_url),
        },
        (Some(access), Some(refresh)) => AuthDecision::Proceed(Session {
            access_token: access.clone(),
            refresh_token: refresh.clone(),
        }),
    }
}

/// Middleware gating protected routes. Never mutates cookies itself.
pub async fn require_session(mut req: Request, next: Next) -> Response {
    let cookies = RequestCookies::from_headers(req.headers());
    let original_url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    debug!(
        "Auth gate {} - access_token: {}, refresh_token: {}",
        original_url,
        if cookies.access_token.is_some() { "present" } else { "missing" },
        if cookies.refresh_token.is_some() { "present" } else { "missing" },
    );

    match decide(&cookies, &original_url) {
        AuthDecision::Login => SessionRedirect::to(LOGIN_PATH).into_response(),
        AuthDecision::Authorize => SessionRedirect::to(AUTH_PATH).into_response(),
        AuthDecision::Refresh { location } => SessionRedirect::to(location).into_response(),
        AuthDecision::Proceed(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
    }
}

/// Uniform reaction of a protected handler to an upstream failure.
///
/// A 401 clears only the access cookie and resumes through the refresh
/// endpoint; anything else clears both and forces a fresh login.
pub fn session_failure(err: &SpotifyError, original_url: &str) -> SessionRedirect {
    warn!("Upstream failure while serving {}: {}", original_url, err);
    if err.is_unauthorized() {
        return SessionRedirect::to(refresh_redirect_location(original_url))
            .with(CookieChange::clear(ACCESS_TOKEN_COOKIE));
    }
    SessionRedirect::to(LOGIN_PATH)
        .with(CookieChange::clear(ACCESS_TOKEN_COOKIE))
        .with(CookieChange::clear(REFRESH_TOKEN_COOKIE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookies(access: Option<&str>, refresh: Option<&str>) -> RequestCookies {
        RequestCookies {
            access_token: access.map(String::from),
            refresh_token: refresh.map(String::from),
            auth_state: None,
        }
    }

    #[test]
    fn decision_table_covers_all_cookie_states() {
        assert_eq!(decide(&cookies(None, None), "/"), AuthDecision::Login);
        assert_eq!(
            decide(&cookies(Some("a"), None), "/"),
            AuthDecision::Authorize
        );
        assert_eq!(
            decide(&cookies(None, Some("r")), "/profile"),
            AuthDecision::Refresh {
                location: "/auth/refresh_tokens?redirect_to=%2Fprofile".to_string()
            }
        );
        assert_eq!(
            decide(&cookies(Some("a"), Some("r")), "/"),
            AuthDecision::Proceed(Session {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
            })
        );
    }

    #[test]
    fn refresh_location_keeps_query_string() {
        assert_eq!(
            refresh_redirect_location("/search/albums/abba/pages/2?x=1"),
            "/auth/refresh_tokens?redirect_to=%2Fsearch%2Falbums%2Fabba%2Fpages%2F2%3Fx%3D1"
        );
    }

    #[test]
    fn parses_cookie_header_and_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc; refresh_token=; spotify_auth_state=xyz"),
        );
        let parsed = RequestCookies::from_headers(&headers);
        assert_eq!(parsed.access_token.as_deref(), Some("abc"));
        assert_eq!(parsed.refresh_token, None);
        assert_eq!(parsed.auth_state.as_deref(), Some("xyz"));
    }

    #[test]
    fn credential_cookies_use_expires_in_and_fixed_refresh_lifetime() {
        let token = TokenResponse {
            access_token: "new-access".to_string(),
            token_type: Some("Bearer".to_string()),
            scope: None,
            expires_in: 3600,
            refresh_token: Some("new-refresh".to_string()),
        };
        let changes = credential_cookies(&token);
        assert_eq!(
            changes[0].header_value(),
            "access_token=new-access; Max-Age=3600; Path=/; HttpOnly; SameSite=Lax"
        );
        assert_eq!(
            changes[1].header_value(),
            "refresh_token=new-refresh; Max-Age=604800; Path=/; HttpOnly; SameSite=Lax"
        );

        let without_rotation = TokenResponse {
            refresh_token: None,
            ..token
        };
        assert_eq!(credential_cookies(&without_rotation).len(), 1);
    }

    #[test]
    fn unauthorized_clears_access_and_resumes_via_refresh() {
        let err = SpotifyError::Status {
            status: 401,
            body: String::new(),
        };
        let redirect = session_failure(&err, "/profile");
        assert_eq!(redirect.location, "/auth/refresh_tokens?redirect_to=%2Fprofile");
        assert_eq!(redirect.cookies, vec![CookieChange::clear(ACCESS_TOKEN_COOKIE)]);
    }

    #[test]
    fn other_failures_clear_both_and_go_to_login() {
        let redirect = session_failure(&SpotifyError::Network("timeout".to_string()), "/albums");
        assert_eq!(redirect.location, "/login");
        assert_eq!(
            redirect.cookies,
            vec![
                CookieChange::clear(ACCESS_TOKEN_COOKIE),
                CookieChange::clear(REFRESH_TOKEN_COOKIE)
            ]
        );
    }

    #[test]
    fn redirect_response_carries_location_and_cookies() {
        let response = SessionRedirect::to("/login")
            .with(CookieChange::clear(ACCESS_TOKEN_COOKIE))
            .with(CookieChange::clear(REFRESH_TOKEN_COOKIE))
            .into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        let set_cookies: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(set_cookies.len(), 2);
        assert!(set_cookies[0].starts_with("access_token=; Max-Age=0"));
        assert!(set_cookies[1].starts_with("refresh_token=; Max-Age=0"));
    }
}
