//! Course handlers: course CRUD, queue creation, and course-admin
//! management.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use ohq_db::models::course::{Course, CourseSubmission};
use ohq_db::models::queue::{Queue, QueueSubmission};
use ohq_db::repositories::{CourseRepo, QueueRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::read_body;
use crate::middleware::context::{resolve_site_admin, CourseCtx};
use crate::middleware::identity::Identity;
use crate::state::AppState;

/// GET /courses
pub async fn list_courses(State(state): State<AppState>) -> AppResult<Json<Vec<Course>>> {
    let mut conn = state.pool.acquire().await?;
    let courses = CourseRepo::list(&mut conn).await?;
    Ok(Json(courses))
}

/// POST /courses (site admin)
pub async fn add_course(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<CourseSubmission>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.pool.acquire().await?;
    if !resolve_site_admin(&mut conn, &state.config, &identity).await? {
        tracing::warn!("non-admin attempted to create a course");
        return Err(AppError::forbidden("You're not supposed to be here."));
    }
    drop(conn);

    state.limits.creation.check(&identity.email)?;

    let submission = read_body(body, "course")?;
    if submission.short_name.is_empty() || submission.full_name.is_empty() {
        return Err(AppError::validation(
            "It looks like you left out some fields in the course!",
        ));
    }

    let mut tx = state.pool.begin().await?;
    let course = CourseRepo::create(&mut tx, &submission).await?;
    tx.commit().await?;

    tracing::info!(course_id = %course.id, "created course");
    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /courses/{id}
pub async fn get_course(Extension(ctx): Extension<CourseCtx>) -> Json<Course> {
    Json(ctx.course)
}

/// PUT /courses/{id}
pub async fn update_course(
    State(state): State<AppState>,
    Extension(ctx): Extension<CourseCtx>,
    _identity: Identity,
    body: Result<Json<CourseSubmission>, JsonRejection>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let submission = read_body(body, "course")?;
    if submission.short_name.is_empty() || submission.full_name.is_empty() {
        return Err(AppError::validation(
            "It looks like you left out some fields in the course!",
        ));
    }

    let mut tx = state.pool.begin().await?;
    CourseRepo::update(&mut tx, &ctx.course.id, &submission).await?;
    tx.commit().await?;

    tracing::info!("updated course");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /courses/{id}
pub async fn delete_course(
    State(state): State<AppState>,
    Extension(ctx): Extension<CourseCtx>,
    _identity: Identity,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;

    let mut tx = state.pool.begin().await?;
    CourseRepo::soft_delete(&mut tx, &ctx.course.id).await?;
    tx.commit().await?;

    tracing::info!("removed course");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /courses/{id}/queues
pub async fn get_queues(
    State(state): State<AppState>,
    Extension(ctx): Extension<CourseCtx>,
) -> AppResult<Json<Vec<Queue>>> {
    let mut conn = state.pool.acquire().await?;
    let queues = QueueRepo::for_course(&mut conn, &ctx.course.id).await?;
    Ok(Json(queues))
}

/// POST /courses/{id}/queues (course admin)
pub async fn add_queue(
    State(state): State<AppState>,
    Extension(ctx): Extension<CourseCtx>,
    identity: Identity,
    body: Result<Json<QueueSubmission>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    ctx.require_admin()?;
    state.limits.creation.check(&identity.email)?;

    let submission = read_body(body, "queue")?;
    if submission.name.is_empty() {
        return Err(AppError::validation(
            "It looks like you missed some fields in the queue!",
        ));
    }

    let mut tx = state.pool.begin().await?;
    let queue = QueueRepo::create(&mut tx, &ctx.course.id, &submission).await?;
    tx.commit().await?;

    tracing::info!(queue_id = %queue.id, "created queue");
    Ok((StatusCode::CREATED, Json(queue)))
}

// ---------------------------------------------------------------------------
// Course admins
// ---------------------------------------------------------------------------

/// GET /courses/{id}/admins
pub async fn get_admins(
    State(state): State<AppState>,
    Extension(ctx): Extension<CourseCtx>,
    _identity: Identity,
) -> AppResult<Json<Vec<String>>> {
    ctx.require_admin()?;
    let mut conn = state.pool.acquire().await?;
    let admins = CourseRepo::admins(&mut conn, &ctx.course.id).await?;
    Ok(Json(admins))
}

/// POST /courses/{id}/admins
pub async fn add_admins(
    State(state): State<AppState>,
    Extension(ctx): Extension<CourseCtx>,
    _identity: Identity,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let emails = read_body(body, "admin emails")?;

    let mut tx = state.pool.begin().await?;
    CourseRepo::add_admins(&mut tx, &ctx.course.id, &emails).await?;
    tx.commit().await?;

    tracing::info!(count = emails.len(), "added course admins");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /courses/{id}/admins
pub async fn set_admins(
    State(state): State<AppState>,
    Extension(ctx): Extension<CourseCtx>,
    _identity: Identity,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let emails = read_body(body, "admin emails")?;

    let mut tx = state.pool.begin().await?;
    CourseRepo::set_admins(&mut tx, &ctx.course.id, &emails).await?;
    tx.commit().await?;

    tracing::info!(count = emails.len(), "replaced course admins");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /courses/{id}/admins
pub async fn remove_admins(
    State(state): State<AppState>,
    Extension(ctx): Extension<CourseCtx>,
    _identity: Identity,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let emails = read_body(body, "admin emails")?;

    let mut tx = state.pool.begin().await?;
    CourseRepo::remove_admins(&mut tx, &ctx.course.id, &emails).await?;
    tx.commit().await?;

    tracing::info!(count = emails.len(), "removed course admins");
    Ok(StatusCode::NO_CONTENT)
}
