//! OIDC login, callback, and logout.
//!
//! The pre-login session cookie carries only the state parameter (and the
//! PKCE verifier when enabled); a successful callback replaces it with the
//! identity claims from the userinfo endpoint.

use axum::extract::{Extension, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::auth::oidc::{pkce_challenge, random_token, STATE_LENGTH};
use crate::auth::session::{self, SessionData};
use crate::error::{AppError, AppResult};
use crate::middleware::real_ip::ClientIp;
use crate::state::AppState;

fn with_cookie(mut response: Response, cookie: &str) -> AppResult<Response> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| AppError::internal("session cookie is not a valid header value"))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(response)
}

/// GET /oauth2login
pub async fn login(State(state): State<AppState>) -> AppResult<Response> {
    let oauth_state = random_token(STATE_LENGTH);

    let mut data = SessionData {
        state: Some(oauth_state.clone()),
        ..Default::default()
    };

    let challenge = if state.config.oauth_use_pkce {
        let verifier = random_token(STATE_LENGTH);
        let challenge = pkce_challenge(&verifier);
        data.pkce_verifier = Some(verifier);
        Some(challenge)
    } else {
        None
    };

    let url = state
        .oidc
        .authorization_url(&state.config, &oauth_state, challenge.as_deref());

    let cookie = session::set_cookie(&data, &state.config);
    with_cookie(Redirect::temporary(&url).into_response(), &cookie)
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// GET /oauth2callback
pub async fn callback(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Query(query): Query<CallbackQuery>,
    headers: axum::http::HeaderMap,
) -> AppResult<Response> {
    state.limits.oauth_callback.check(&ip)?;

    let login_url = format!("{}oauth2login", state.config.base_url);

    // No (or unreadable) pre-login session: start over.
    let Some(data) = session::read(&headers, &state.config.sessions_key) else {
        tracing::warn!("oauth callback without a valid session");
        return with_cookie(
            Redirect::temporary(&login_url).into_response(),
            &session::expired_cookie(),
        );
    };

    let saved_state = data
        .state
        .clone()
        .ok_or_else(|| AppError::unauthorized("Something went really wrong."))?;
    if query.state.as_deref() != Some(saved_state.as_str()) {
        tracing::warn!("oauth state mismatch");
        return Err(AppError::unauthorized("Something went really wrong."));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::validation("The login response is missing its code."))?;

    let token = state
        .oidc
        .exchange_code(&state.config, &code, data.pkce_verifier.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to exchange authorization code");
            AppError::internal("token exchange failed")
        })?;

    let info = state.oidc.userinfo(&token).await.map_err(|e| {
        tracing::error!(error = %e, "failed to fetch userinfo");
        AppError::internal("userinfo fetch failed")
    })?;

    tracing::info!(email = %info.email, name = %info.name, "processed login");

    let session_data = SessionData {
        email: Some(info.email),
        name: Some(info.name),
        first_name: Some(info.given_name),
        groups: info.groups,
        ..Default::default()
    };
    let cookie = session::set_cookie(&session_data, &state.config);

    with_cookie(
        Redirect::temporary(&state.config.base_url).into_response(),
        &cookie,
    )
}

/// GET /logout
pub async fn logout(State(state): State<AppState>) -> AppResult<Response> {
    tracing::info!("logged out");
    with_cookie(
        Redirect::temporary(&state.config.base_url).into_response(),
        &session::expired_cookie(),
    )
}
