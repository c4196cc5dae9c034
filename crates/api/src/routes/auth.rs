//! Login-flow routes.

use axum::routing::get;
use axum::Router;

use crate::handlers::oauth;
use crate::state::AppState;

/// ```text
/// GET /oauth2login      redirect to the identity provider
/// GET /oauth2callback   complete the login (rate limited)
/// GET /logout           clear the session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/oauth2login", get(oauth::login))
        .route("/oauth2callback", get(oauth::callback))
        .route("/logout", get(oauth::logout))
}
