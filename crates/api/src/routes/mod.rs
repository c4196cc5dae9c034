//! Route tables, one module per resource.

pub mod auth;
pub mod course;
pub mod health;
pub mod queue;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Assemble the full route tree.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(course::router(state))
        .merge(queue::router(state))
        .merge(users::router())
        .merge(auth::router())
}
