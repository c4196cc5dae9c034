//! Identity routes.

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// ```text
/// GET /users/@me              session identity and capabilities
/// GET /users/@am-site-admin   forward-auth check
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/@me", get(users::me))
        .route("/users/@am-site-admin", get(users::am_site_admin))
}
