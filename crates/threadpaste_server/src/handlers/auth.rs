//! Login, OAuth callback and logout handlers.

use crate::{
    error::HttpError,
    session::{expired_session_cookie, sanitize_next, session_cookie, session_token},
    AppError, AppState,
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use threadpaste_core::models::user::User;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Query parameters the provider sends back to the callback.
#[derive(Debug, Deserialize)]
pub struct AuthorizedQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Start the OAuth handshake.
///
/// # Returns
/// A redirect to the provider's authorize URL.
///
/// # Errors
/// Returns 503 when no client id is configured.
pub async fn login(
    State(app): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, HttpError> {
    let login_state = app
        .sessions
        .begin_login(sanitize_next(query.next.as_deref()))?;
    match app
        .oauth
        .authorize_url(&app.config.oauth_redirect_uri(), &login_state)
    {
        Ok(url) => Ok(Redirect::to(&url)),
        Err(err) => {
            app.sessions.finish_login(&login_state)?;
            Err(err.into())
        }
    }
}

fn signed_in_response(app: &AppState, user: &User, next: Option<String>) -> Result<Response, HttpError> {
    let token = app.sessions.start(user.id)?;
    let cookie = session_cookie(&token, app.config.secure_cookies());
    let target = next.unwrap_or_else(|| "/".to_string());
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(&target)).into_response())
}

/// OAuth callback: exchange the code, upsert the user and start a session.
///
/// A provider `error` (e.g. the user denied access) redirects without
/// signing in.
///
/// # Errors
/// Returns 400 for an unknown or replayed `state` or a missing `code`, and
/// 502 when the provider exchange fails.
pub async fn authorized(
    State(app): State<AppState>,
    Query(query): Query<AuthorizedQuery>,
) -> Result<Response, HttpError> {
    let pending = match query.state.as_deref() {
        Some(login_state) => app.sessions.finish_login(login_state)?,
        None => None,
    };

    if let Some(reason) = query.error.as_deref() {
        tracing::info!("Login denied by provider: {}", reason);
        let target = pending.flatten().unwrap_or_else(|| "/".to_string());
        return Ok(Redirect::to(&target).into_response());
    }

    let Some(next) = pending else {
        return Err(AppError::BadRequest("Unknown or expired login state".to_string()).into());
    };
    let Some(code) = query.code.as_deref().filter(|code| !code.is_empty()) else {
        return Err(AppError::BadRequest("Missing authorization code".to_string()).into());
    };

    let identity = app
        .oauth
        .fetch_identity(code, &app.config.oauth_redirect_uri())
        .await?;
    let user = app.service.login(&identity)?;
    signed_in_response(&app, &user, next)
}

/// Drop the caller's session and clear the cookie.
pub async fn logout(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    if let Some(token) = session_token(&headers) {
        app.sessions.end(&token)?;
    }
    let cookie = expired_session_cookie(app.config.secure_cookies());
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}
