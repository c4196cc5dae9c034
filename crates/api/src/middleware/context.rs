//! Queue and course context middleware.
//!
//! Routes scoped under `/queues/{id}` and `/courses/{id}` get their target
//! entity loaded once, together with the viewer's course-admin capability,
//! and carry both through request extensions.

use std::collections::HashMap;

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use ohq_core::Id;
use ohq_db::models::course::Course;
use ohq_db::models::queue::Queue;
use ohq_db::repositories::{AdminRepo, CourseRepo, QueueRepo};
use sqlx::PgConnection;

use crate::auth::session;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::identity::Identity;
use crate::state::AppState;

pub const QUEUE_NOT_FOUND: &str = "That queue is hiding from me... make sure it exists!";
pub const COURSE_NOT_FOUND: &str = "That course is hiding from me... make sure it exists!";

/// Context for a request scoped to one queue.
#[derive(Clone)]
pub struct QueueCtx {
    pub queue: Queue,
    /// Whether the viewer administers this queue's course.
    pub is_admin: bool,
    /// The viewer's identity, when a valid session is present.
    pub identity: Option<Identity>,
}

impl QueueCtx {
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::forbidden("You must be a course admin to do that."))
        }
    }
}

/// Context for a request scoped to one course.
#[derive(Clone)]
pub struct CourseCtx {
    pub course: Course,
    pub is_admin: bool,
    pub identity: Option<Identity>,
}

impl CourseCtx {
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::forbidden("You must be a course admin to do that."))
        }
    }
}

/// Whether the identity is a site admin, by identity-provider group or by
/// the `site_admins` table.
pub async fn resolve_site_admin(
    conn: &mut PgConnection,
    config: &ServerConfig,
    identity: &Identity,
) -> Result<bool, sqlx::Error> {
    if config.any_in_site_admin_groups(&identity.groups) {
        return Ok(true);
    }
    AdminRepo::in_site_admins(conn, &identity.email).await
}

/// Whether the identity administers the course (site admins administer
/// every course).
pub async fn resolve_course_admin(
    conn: &mut PgConnection,
    config: &ServerConfig,
    identity: &Identity,
    course: &Id,
) -> Result<bool, sqlx::Error> {
    if resolve_site_admin(conn, config, identity).await? {
        return Ok(true);
    }
    AdminRepo::is_course_admin(conn, course, &identity.email).await
}

/// Load the queue named by `{id}` and compute the viewer's capability.
pub async fn queue_context(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let id = parse_id(&params, "id", "That doesn't look like a valid queue id.")?;

    let mut conn = state.pool.acquire().await?;
    let queue = QueueRepo::get(&mut conn, &id)
        .await?
        .ok_or_else(|| AppError::not_found(QUEUE_NOT_FOUND))?;

    let identity = session::read(request.headers(), &state.config.sessions_key)
        .and_then(Identity::from_session);

    let is_admin = match &identity {
        Some(identity) => {
            resolve_course_admin(&mut conn, &state.config, identity, &queue.course).await?
        }
        None => false,
    };
    drop(conn);

    request.extensions_mut().insert(QueueCtx {
        queue,
        is_admin,
        identity,
    });
    Ok(next.run(request).await)
}

/// Load the course named by `{id}` and compute the viewer's capability.
pub async fn course_context(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let id = parse_id(&params, "id", "That doesn't look like a valid course id.")?;

    let mut conn = state.pool.acquire().await?;
    let course = CourseRepo::get(&mut conn, &id)
        .await?
        .ok_or_else(|| AppError::not_found(COURSE_NOT_FOUND))?;

    let identity = session::read(request.headers(), &state.config.sessions_key)
        .and_then(Identity::from_session);

    let is_admin = match &identity {
        Some(identity) => {
            resolve_course_admin(&mut conn, &state.config, identity, &course.id).await?
        }
        None => false,
    };
    drop(conn);

    request.extensions_mut().insert(CourseCtx {
        course,
        is_admin,
        identity,
    });
    Ok(next.run(request).await)
}

fn parse_id(
    params: &HashMap<String, String>,
    name: &str,
    message: &str,
) -> AppResult<Id> {
    let raw = params
        .get(name)
        .ok_or_else(|| AppError::internal(format!("route is missing the {name} parameter")))?;
    raw.parse()
        .map_err(|_| AppError::validation(message.to_string()))
}
