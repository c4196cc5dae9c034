//! Session identity extraction.
//!
//! [`Identity`] is the required-login extractor: handlers that take it
//! reject unauthenticated requests with 401 (and an invalidating session
//! cookie, via the error mapping). Handlers that tolerate anonymous viewers
//! read the optional identity from their request context instead.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::session::{self, SessionData};
use crate::error::AppError;
use crate::state::AppState;

/// An authenticated session identity.
#[derive(Debug, Clone)]
pub struct Identity {
    pub email: String,
    pub name: String,
    pub first_name: String,
    /// Identity-provider group claims, used for the site-admin check.
    pub groups: Vec<String>,
}

impl Identity {
    /// Build an identity from verified session data. `None` when the
    /// session has not completed a login.
    pub fn from_session(data: SessionData) -> Option<Self> {
        Some(Self {
            email: data.email?,
            name: data.name.unwrap_or_default(),
            first_name: data.first_name.unwrap_or_default(),
            groups: data.groups,
        })
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let data = session::read(&parts.headers, &state.config.sessions_key)
            .ok_or_else(|| AppError::unauthorized("Come back with a login!"))?;

        let identity = Identity::from_session(data)
            .ok_or_else(|| AppError::unauthorized("Come back with a login!"))?;

        let domain = &state.config.valid_domain;
        if !domain.is_empty() && !identity.email.ends_with(&format!("@{domain}")) {
            tracing::warn!(email = %identity.email, valid_domain = %domain,
                "valid session with email outside the accepted domain");
            return Err(AppError::unauthorized(format!(
                "It looks like you don't have an @{domain} account."
            )));
        }

        Ok(identity)
    }
}
