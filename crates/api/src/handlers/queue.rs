//! Queue-scoped handlers: the state snapshot, queue metadata, schedule,
//! configuration, roster/groups, and messaging.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Datelike, Local};
use ohq_core::{policy, validation, Id};
use ohq_db::models::entry::RemovedEntry;
use ohq_db::models::message::{Message, MessageSubmission, BROADCAST_RECEIVER};
use ohq_db::models::queue::{ConfigurationUpdate, QueueSubmission};
use ohq_db::repositories::{
    AnnouncementRepo, EntryRepo, QueueRepo, RosterRepo, ScheduleRepo,
};
use ohq_events::event::names;
use ohq_events::{topics, WsEvent};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::read_body;
use crate::middleware::context::{QueueCtx, QUEUE_NOT_FOUND};
use crate::middleware::identity::Identity;
use crate::publish::PendingEvents;
use crate::state::AppState;

/// Archived entries returned to a just-connected admin client.
const SNAPSHOT_STACK_LIMIT: i64 = 20;

/// Archived entries returned by the dedicated stack endpoint.
const STACK_LIMIT: i64 = 10_000;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// GET /queues/{id}
///
/// The full view a just-connected client needs: sorted entries (projected
/// by capability), configuration, today's schedule, open state, and
/// announcements; admins additionally get the recent stack and the online
/// user list.
pub async fn get_queue(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
) -> AppResult<Json<serde_json::Value>> {
    let queue = &ctx.queue;
    let viewer = ctx.identity.as_ref().map(|identity| identity.email.as_str());
    let mut conn = state.pool.acquire().await?;

    let entries = EntryRepo::active_for_queue(&mut conn, &queue.id).await?;
    let queue_view: Vec<serde_json::Value> = entries
        .iter()
        .map(|entry| {
            if ctx.is_admin || viewer == Some(entry.email.as_str()) {
                serde_json::to_value(entry)
            } else {
                serde_json::to_value(entry.anonymized())
            }
            .unwrap_or(serde_json::Value::Null)
        })
        .collect();

    let config = QueueRepo::configuration(&mut conn, &queue.id)
        .await?
        .ok_or_else(|| AppError::not_found(QUEUE_NOT_FOUND))?;

    let now = Local::now();
    let day = now.weekday().num_days_from_sunday() as i32;
    let schedule = ScheduleRepo::for_day(&mut conn, &queue.id, day)
        .await?
        .unwrap_or_default();
    let half_hour = policy::current_half_hour(now);
    let open = policy::is_open(config.scheduled, config.manual_open, &schedule, half_hour);

    let announcements = AnnouncementRepo::for_queue(&mut conn, &queue.id).await?;

    let mut response = json!({
        "queue": queue_view,
        "config": config,
        "schedule": schedule,
        "half_hour": half_hour,
        "open": open,
        "announcements": announcements,
    });

    if ctx.is_admin {
        let stack: Vec<RemovedEntry> = EntryRepo::stack(&mut conn, &queue.id, SNAPSHOT_STACK_LIMIT)
            .await?
            .iter()
            .map(|entry| entry.removed())
            .collect();
        response["stack"] = json!(stack);
        response["online"] = json!(state.presence.online_emails(&queue.id));
    }

    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Queue metadata
// ---------------------------------------------------------------------------

/// PUT /queues/{id}
pub async fn update_queue(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    body: Result<Json<QueueSubmission>, JsonRejection>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let submission = read_body(body, "queue")?;
    if submission.name.is_empty() {
        return Err(AppError::validation(
            "It looks like you missed some fields in the queue!",
        ));
    }

    let mut tx = state.pool.begin().await?;
    if !QueueRepo::update(&mut tx, &ctx.queue.id, &submission.name, &submission.location).await? {
        return Err(AppError::not_found(QUEUE_NOT_FOUND));
    }
    tx.commit().await?;

    tracing::info!("updated queue");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /queues/{id}
pub async fn remove_queue(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;

    let mut tx = state.pool.begin().await?;
    if !QueueRepo::soft_delete(&mut tx, &ctx.queue.id).await? {
        return Err(AppError::not_found(QUEUE_NOT_FOUND));
    }
    tx.commit().await?;

    tracing::info!("removed queue");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /queues/{id}/stack
pub async fn get_stack(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
) -> AppResult<Json<Vec<RemovedEntry>>> {
    ctx.require_admin()?;

    let mut conn = state.pool.acquire().await?;
    let stack: Vec<RemovedEntry> = EntryRepo::stack(&mut conn, &ctx.queue.id, STACK_LIMIT)
        .await?
        .iter()
        .map(|entry| entry.removed())
        .collect();

    tracing::info!(stack_length = stack.len(), "fetched stack");
    Ok(Json(stack))
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// GET /queues/{id}/schedule
pub async fn get_schedule(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
) -> AppResult<Json<Vec<String>>> {
    let mut conn = state.pool.acquire().await?;
    let week = ScheduleRepo::week(&mut conn, &ctx.queue.id).await?;
    Ok(Json(week))
}

/// PUT /queues/{id}/schedule
pub async fn update_schedule(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let week = read_body(body, "schedules")?;
    validation::validate_schedule_week(&week)?;

    let mut tx = state.pool.begin().await?;
    ScheduleRepo::replace_week(&mut tx, &ctx.queue.id, &week).await?;

    let mut events = PendingEvents::new();
    events.push(
        topics::generic(&ctx.queue.id),
        WsEvent::new(names::REFRESH, serde_json::Value::Null),
    );
    events.commit(tx, &state.bus).await?;

    tracing::info!("updated queue schedule");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// GET /queues/{id}/configuration
pub async fn get_configuration(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.pool.acquire().await?;
    let config = QueueRepo::configuration(&mut conn, &ctx.queue.id)
        .await?
        .ok_or_else(|| AppError::not_found(QUEUE_NOT_FOUND))?;
    Ok(Json(config))
}

/// PUT /queues/{id}/configuration
pub async fn update_configuration(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    body: Result<Json<ConfigurationUpdate>, JsonRejection>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let config = read_body(body, "configuration")?;

    validation::validate_prompts(&config.prompts)?;
    if config.cooldown < 0 {
        return Err(AppError::validation("The cooldown can't be negative."));
    }

    let mut tx = state.pool.begin().await?;
    if !QueueRepo::update_configuration(&mut tx, &ctx.queue.id, &config).await? {
        return Err(AppError::not_found(QUEUE_NOT_FOUND));
    }

    // Clients reload their whole state rather than patching piecemeal.
    let mut events = PendingEvents::new();
    events.push(
        topics::generic(&ctx.queue.id),
        WsEvent::new(names::REFRESH, serde_json::Value::Null),
    );
    events.commit(tx, &state.bus).await?;

    tracing::info!("updated queue configuration");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct OpenQuery {
    open: Option<String>,
}

/// PUT /queues/{id}/configuration/manual-open?open=true|false
pub async fn update_open_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    Query(query): Query<OpenQuery>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;

    let open = match query.open.as_deref() {
        Some("true") => true,
        Some("false") => false,
        other => {
            tracing::warn!(open = ?other, "unknown open value");
            return Err(AppError::validation(
                "We couldn't read the open status from the `open` query parameter.",
            ));
        }
    };

    let mut tx = state.pool.begin().await?;
    if !QueueRepo::set_manual_open(&mut tx, &ctx.queue.id, open).await? {
        return Err(AppError::not_found(QUEUE_NOT_FOUND));
    }

    let mut events = PendingEvents::new();
    events.push(
        topics::generic(&ctx.queue.id),
        WsEvent::new(names::QUEUE_OPEN, open),
    );
    events.commit(tx, &state.bus).await?;

    tracing::info!(open, "updated queue open status");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

/// POST /queues/{id}/messages
///
/// Messages are never persisted: the sender is redacted, an id is minted,
/// and the message fans out immediately (no transaction to gate on).
pub async fn send_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    body: Result<Json<MessageSubmission>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    ctx.require_admin()?;
    let submission = read_body(body, "message")?;

    if submission.receiver.is_empty() || submission.content.is_empty() {
        return Err(AppError::validation(
            "It looks like you left out some fields from the message.",
        ));
    }

    let message = Message {
        id: Id::generate(),
        queue: ctx.queue.id.clone(),
        sender: String::new(),
        receiver: submission.receiver,
        content: submission.content,
    };

    if message.receiver == BROADCAST_RECEIVER {
        tracing::info!("broadcast message to queue");
        state.bus.publish(
            &topics::generic(&ctx.queue.id),
            &WsEvent::new(names::MESSAGE_CREATE, &message),
        );
    } else {
        tracing::info!(to_user = %message.receiver, "direct message");
        state.bus.publish(
            &topics::email(&ctx.queue.id, &message.receiver),
            &WsEvent::new(names::MESSAGE_CREATE, &message),
        );
    }

    Ok((StatusCode::CREATED, Json(message)))
}

// ---------------------------------------------------------------------------
// Roster and groups
// ---------------------------------------------------------------------------

/// GET /queues/{id}/roster
pub async fn get_roster(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
) -> AppResult<Json<Vec<String>>> {
    ctx.require_admin()?;
    let mut conn = state.pool.acquire().await?;
    let roster = RosterRepo::emails(&mut conn, &ctx.queue.id).await?;
    Ok(Json(roster))
}

/// GET /queues/{id}/groups
pub async fn get_groups(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
) -> AppResult<Json<Vec<Vec<String>>>> {
    ctx.require_admin()?;
    let mut conn = state.pool.acquire().await?;
    let groups = RosterRepo::groups(&mut conn, &ctx.queue.id).await?;
    Ok(Json(groups))
}

/// PUT /queues/{id}/groups
///
/// Replaces the groups and rebuilds the roster from the flattened upload.
pub async fn update_groups(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    body: Result<Json<Vec<Vec<String>>>, JsonRejection>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;

    let groups = match body {
        Ok(Json(groups)) => groups,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "failed to read groups from body");
            return Err(AppError::validation(format!(
                "I couldn't read the groups you uploaded. Make sure the file is structured \
                 as an array of arrays of students' emails, each inner array representing a \
                 group. This error might help: {rejection}"
            )));
        }
    };
    validation::validate_groups(&groups)?;

    let mut tx = state.pool.begin().await?;
    RosterRepo::replace_groups(&mut tx, &ctx.queue.id, &groups).await?;

    let students: Vec<String> = groups.into_iter().flatten().collect();
    RosterRepo::replace(&mut tx, &ctx.queue.id, &students).await?;
    tx.commit().await?;

    tracing::info!("updated groups");
    Ok(StatusCode::NO_CONTENT)
}
