//! Announcement handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use ohq_core::Id;
use ohq_db::models::announcement::AnnouncementSubmission;
use ohq_db::repositories::AnnouncementRepo;
use ohq_events::event::names;
use ohq_events::{topics, WsEvent};

use crate::error::{AppError, AppResult};
use crate::handlers::read_body;
use crate::middleware::context::QueueCtx;
use crate::middleware::identity::Identity;
use crate::publish::PendingEvents;
use crate::state::AppState;

/// POST /queues/{id}/announcements
pub async fn add_announcement(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    body: Result<Json<AnnouncementSubmission>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    ctx.require_admin()?;
    let submission = read_body(body, "announcement")?;
    if submission.content.is_empty() {
        return Err(AppError::validation(
            "It looks like you left out some fields in the announcement.",
        ));
    }

    let mut tx = state.pool.begin().await?;
    let announcement =
        AnnouncementRepo::create(&mut tx, &ctx.queue.id, &submission.content).await?;

    let mut events = PendingEvents::new();
    events.push(
        topics::generic(&ctx.queue.id),
        WsEvent::new(names::ANNOUNCEMENT_CREATE, &announcement),
    );
    events.commit(tx, &state.bus).await?;

    tracing::info!(announcement_id = %announcement.id, "created announcement");
    Ok((StatusCode::CREATED, Json(announcement)))
}

/// DELETE /queues/{id}/announcements/{announcement_id}
pub async fn remove_announcement(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    Path((_, announcement_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let announcement_id: Id = announcement_id
        .parse()
        .map_err(|_| AppError::validation("That doesn't look like a valid announcement id."))?;

    let mut tx = state.pool.begin().await?;
    if !AnnouncementRepo::delete(&mut tx, &ctx.queue.id, &announcement_id).await? {
        return Err(AppError::not_found("I couldn't find that announcement anywhere."));
    }

    let mut events = PendingEvents::new();
    events.push(
        topics::generic(&ctx.queue.id),
        WsEvent::new(names::ANNOUNCEMENT_DELETE, announcement_id.to_string()),
    );
    events.commit(tx, &state.bus).await?;

    tracing::info!(announcement_id = %announcement_id, "removed announcement");
    Ok(StatusCode::NO_CONTENT)
}
