//! Session cookie handling and provider-token lookup.

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use chrono::Utc;

use crate::auth::Session;
use crate::core::ids::SessionId;
use crate::core::provider::Provider;
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "embedhub_session";

/// Session id carried by the request's cookies, if any parses.
#[must_use]
pub fn session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.trim().trim_matches('"').parse().ok())
}

/// Live session for the request.
#[must_use]
pub fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    session_id(headers).and_then(|id| state.sessions.get(id))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Provider access token for a data route.
///
/// An explicit `Authorization: Bearer` header wins; otherwise the session
/// cookie must name a live session for `provider`.
///
/// # Errors
/// Returns 401 when neither yields a token for `provider`.
pub fn access_token(state: &AppState, headers: &HeaderMap, provider: Provider) -> ApiResult<String> {
    if let Some(token) = bearer_token(headers) {
        return Ok(token);
    }
    require_provider_session(state, headers, provider).map(|session| session.access_token)
}

/// Live session of any provider.
///
/// # Errors
/// Returns 401 when the request carries no live session.
pub fn require_session(state: &AppState, headers: &HeaderMap) -> ApiResult<Session> {
    current_session(state, headers).ok_or_else(|| ApiError::unauthorized("Not signed in"))
}

/// Live session signed in with `provider`.
///
/// Routes that write into the vector store use this rather than
/// [`access_token`]: a bearer header alone is never checked upstream there.
///
/// # Errors
/// Returns 401 without a live session, or when it belongs to another provider.
pub fn require_provider_session(
    state: &AppState,
    headers: &HeaderMap,
    provider: Provider,
) -> ApiResult<Session> {
    let session = current_session(state, headers).ok_or_else(|| {
        ApiError::unauthorized(format!("Sign in with {} first", provider.display_name()))
    })?;
    if session.provider != provider {
        return Err(ApiError::unauthorized(format!(
            "Signed in with {}, not {}",
            session.provider.display_name(),
            provider.display_name()
        )));
    }
    Ok(session)
}

/// `Set-Cookie` value for a new session.
#[must_use]
pub fn session_cookie(session: &Session, secure: bool) -> String {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let mut cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
        session.id
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
#[must_use]
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_session_id_from_cookie_header() {
        let id = SessionId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}; other=1")).unwrap(),
        );
        assert_eq!(session_id(&headers), Some(id));

        let mut garbage = HeaderMap::new();
        garbage.insert(COOKIE, HeaderValue::from_static("embedhub_session=nope"));
        assert_eq!(session_id(&garbage), None);
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer gho_abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("gho_abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_clear_cookie() {
        let cookie = clear_session_cookie(true);
        assert!(cookie.starts_with("embedhub_session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.ends_with("; Secure"));
    }
}
