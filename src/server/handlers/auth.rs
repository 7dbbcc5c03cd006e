//! Sign-in routes: OAuth login, callback, session and logout.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::info;

use crate::auth::SessionView;
use crate::core::provider::{Provider, UnknownProvider};
use crate::server::error::{ApiError, ApiResult};
use crate::server::extract::{clear_session_cookie, current_session, session_cookie, session_id};
use crate::server::state::AppState;

fn parse_provider(raw: &str) -> ApiResult<Provider> {
    raw.parse()
        .map_err(|err: UnknownProvider| ApiError::new(StatusCode::NOT_FOUND, err.to_string()))
}

/// Redirect to the provider's consent page.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> ApiResult<Redirect> {
    let provider = parse_provider(&provider)?;
    if !state.oauth.is_configured(provider) {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("{} sign-in is not configured", provider.display_name()),
        ));
    }
    let login_state = state.sessions.begin_login(provider);
    let url = state.oauth.authorize_url(provider, &login_state)?;
    Ok(Redirect::to(&url))
}

/// Query string of the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code.
    pub code: Option<String>,
    /// Login state issued by [`login`].
    pub state: Option<String>,
    /// Error reported by the provider.
    pub error: Option<String>,
    /// Human-readable error from the provider.
    pub error_description: Option<String>,
}

/// Finish the OAuth flow, create a session and send the browser to its dashboard.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Response> {
    let provider = parse_provider(&provider)?;
    if let Some(error) = query.error {
        return Err(ApiError::unauthorized(
            query.error_description.unwrap_or(error),
        ));
    }
    let (Some(code), Some(login_state)) = (query.code, query.state) else {
        return Err(ApiError::bad_request("Missing code or state"));
    };

    state.sessions.complete_login(&login_state, provider)?;
    let grant = state.oauth.exchange_code(provider, &code).await?;
    let user = state
        .oauth
        .fetch_profile(provider, &state.github, &grant.access_token)
        .await?;
    let session = state
        .sessions
        .create(provider, user, grant.access_token, grant.expires_in);
    info!(provider = %provider, user = %session.user.name, "User signed in");

    let cookie = session_cookie(&session, state.config.auth.secure_cookies);
    Ok((
        [(SET_COOKIE, cookie)],
        Redirect::to(provider.dashboard_path()),
    )
        .into_response())
}

/// The signed-in user, without the access token.
pub async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionView>> {
    current_session(&state, &headers)
        .map(|session| Json(session.view()))
        .ok_or_else(|| ApiError::unauthorized("Not signed in"))
}

/// Drop the session and clear the cookie.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        if state.sessions.remove(id) {
            info!(session = %id, "User signed out");
        }
    }
    let cookie = clear_session_cookie(state.config.auth.secure_cookies);
    (StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response()
}
