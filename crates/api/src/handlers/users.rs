//! Identity endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ohq_db::repositories::CourseRepo;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::context::resolve_site_admin;
use crate::middleware::identity::Identity;
use crate::state::AppState;

/// GET /users/@me
pub async fn me(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<serde_json::Value>> {
    let mut conn = state.pool.acquire().await?;
    let site_admin = resolve_site_admin(&mut conn, &state.config, &identity).await?;
    let admin_courses = CourseRepo::admin_courses(&mut conn, &identity.email).await?;

    Ok(Json(json!({
        "email": identity.email,
        "site_admin": site_admin,
        "admin_courses": admin_courses,
        "name": identity.name,
        "first_name": identity.first_name,
    })))
}

/// GET /users/@am-site-admin
///
/// Forward-auth check: 204 for site admins, 403 for everyone else.
pub async fn am_site_admin(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<StatusCode> {
    let mut conn = state.pool.acquire().await?;
    if !resolve_site_admin(&mut conn, &state.config, &identity).await? {
        tracing::warn!("non-admin failed the forward-auth check");
        return Err(AppError::forbidden("You're not supposed to be here."));
    }

    tracing::info!(email = %identity.email, "forward auth passed");
    Ok(StatusCode::NO_CONTENT)
}
