//! Queue entry operations: the heart of the mutation service.
//!
//! Every operation runs inside the request's transaction and publishes its
//! event matrix only after commit. The same entry is serialized per topic:
//! full for admins and the owner, anonymized for everyone else.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use ohq_core::{validation, Id};
use ohq_db::models::entry::{EntrySubmission, QueueEntry};
use ohq_db::models::queue::QueueConfiguration;
use ohq_db::repositories::{EntryRepo, QueueRepo};
use ohq_events::event::names;
use ohq_events::{topics, WsEvent};
use serde::Deserialize;
use sqlx::PgConnection;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::handlers::read_body;
use crate::middleware::context::{QueueCtx, QUEUE_NOT_FOUND};
use crate::middleware::identity::Identity;
use crate::publish::PendingEvents;
use crate::state::AppState;

const ENTRY_NOT_FOUND: &str = "I'm not able to find that queue entry.";
const DUPLICATE_SIGNUP: &str =
    "Don't get greedy! You can only be on the queue once at a time.";

fn parse_entry_id(raw: &str) -> AppResult<Id> {
    raw.parse()
        .map_err(|_| AppError::validation("That doesn't look like a valid entry id."))
}

async fn load_configuration(
    conn: &mut PgConnection,
    queue: &Id,
) -> AppResult<QueueConfiguration> {
    QueueRepo::configuration(conn, queue)
        .await?
        .ok_or_else(|| AppError::not_found(QUEUE_NOT_FOUND))
}

/// Validate a signup/update payload against the queue configuration.
fn validate_submission(
    submission: &EntrySubmission,
    config: &QueueConfiguration,
) -> AppResult<()> {
    if submission.description.is_empty() {
        return Err(AppError::validation(
            "It looks like you left out some fields in the queue entry!",
        ));
    }
    validation::validate_location(&submission.location)?;

    let prompts = validation::parse_prompts(&config.prompts)
        .map_err(|_| AppError::internal("stored prompts are not a list of strings"))?;
    validation::validate_description(&submission.description, &prompts)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Signup
// ---------------------------------------------------------------------------

/// POST /queues/{id}/entries
pub async fn add_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    identity: Identity,
    body: Result<Json<EntrySubmission>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    state.limits.signup.check(&identity.email)?;

    let queue = &ctx.queue;
    let mut tx = state.pool.begin().await?;

    let existing = EntryRepo::active_for_user(&mut tx, &queue.id, &identity.email).await?;
    if let Some(conflicting) = existing.first() {
        tracing::warn!(conflicting_entry = %conflicting.id,
            "signup attempted with an entry already on the queue");
        return Err(AppError::conflict(DUPLICATE_SIGNUP));
    }

    let config = load_configuration(&mut tx, &queue.id).await?;

    if !ctx.is_admin {
        if let Some(denial) =
            EntryRepo::can_add(&mut tx, &queue.id, &config, &identity.email).await?
        {
            tracing::warn!(denial = %denial, "signup refused");
            return Err(AppError::forbidden(format!(
                "My records say you aren't allowed to sign up right now: {denial}."
            )));
        }
    }

    let submission = read_body(body, "queue entry")?;
    validate_submission(&submission, &config)?;

    let priority = EntryRepo::priority_for(&mut tx, &queue.id, &config, &identity.email).await?;

    let entry = match EntryRepo::insert(
        &mut tx,
        &queue.id,
        &identity.email,
        &identity.name,
        &submission.location,
        &submission.description,
        priority,
    )
    .await
    {
        Ok(entry) => entry,
        Err(err) if is_unique_violation(&err) => {
            tracing::warn!("signup lost the race against a concurrent entry");
            return Err(AppError::conflict(DUPLICATE_SIGNUP));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(entry_id = %entry.id, "created queue entry");

    let mut events = PendingEvents::new();
    events.push(
        topics::admin(&queue.id),
        WsEvent::new(names::ENTRY_CREATE, &entry),
    );
    events.push(
        topics::non_privileged(&queue.id),
        WsEvent::new(names::ENTRY_CREATE, entry.anonymized()),
    );
    // The creator gets the full entry on their own topic.
    events.push(
        topics::email(&queue.id, &identity.email),
        WsEvent::new(names::ENTRY_UPDATE, &entry),
    );
    events.commit(tx, &state.bus).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

// ---------------------------------------------------------------------------
// Owner update
// ---------------------------------------------------------------------------

/// PUT /queues/{id}/entries/{entry_id}
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    identity: Identity,
    Path((_, entry_id)): Path<(String, String)>,
    body: Result<Json<EntrySubmission>, JsonRejection>,
) -> AppResult<StatusCode> {
    let entry_id = parse_entry_id(&entry_id)?;
    let queue = &ctx.queue;
    let mut tx = state.pool.begin().await?;

    let entry = EntryRepo::get(&mut tx, &entry_id, false)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!(
                "{ENTRY_NOT_FOUND} Perhaps you were popped off quite recently?"
            ))
        })?;

    if entry.email != identity.email {
        tracing::warn!(entry_email = %entry.email, "attempt to edit someone else's entry");
        return Err(AppError::forbidden("You can't edit someone else's queue entry!"));
    }

    let submission = read_body(body, "queue entry")?;
    let config = load_configuration(&mut tx, &queue.id).await?;
    validate_submission(&submission, &config)?;

    EntryRepo::update_details(
        &mut tx,
        &entry_id,
        &identity.name,
        &submission.location,
        &submission.description,
    )
    .await?;

    // Priority, pinned, and helping are owned by the service, not the body.
    let updated = QueueEntry {
        name: identity.name.clone(),
        location: submission.location,
        description: submission.description,
        ..entry
    };

    let mut events = PendingEvents::new();
    events.push(
        topics::admin(&queue.id),
        WsEvent::new(names::ENTRY_UPDATE, &updated),
    );
    events.push(
        topics::email(&queue.id, &identity.email),
        WsEvent::new(names::ENTRY_UPDATE, &updated),
    );
    events.commit(tx, &state.bus).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

/// DELETE /queues/{id}/entries/{entry_id}
pub async fn remove_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    identity: Identity,
    Path((_, entry_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let entry_id = parse_entry_id(&entry_id)?;
    let queue = &ctx.queue;
    let mut tx = state.pool.begin().await?;

    if !ctx.is_admin {
        let entry = EntryRepo::get(&mut tx, &entry_id, true)
            .await?
            .ok_or_else(|| AppError::not_found(ENTRY_NOT_FOUND))?;
        if entry.email != identity.email {
            tracing::warn!("attempt to remove someone else's entry");
            return Err(AppError::forbidden(
                "Removing someone else's queue entry isn't very nice!",
            ));
        }
    }

    let removed = EntryRepo::archive(&mut tx, &entry_id, &identity.email)
        .await?
        .ok_or_else(|| {
            AppError::not_found(
                "That queue entry was already removed by another staff member! \
                 Try the next one on the queue.",
            )
        })?;

    let waited = removed
        .id
        .timestamp()
        .map(|t| (Utc::now() - t).num_seconds());
    tracing::info!(student_email = %removed.email, seconds_waited = ?waited,
        "removed queue entry");

    let mut events = PendingEvents::new();
    events.push(
        topics::admin(&queue.id),
        WsEvent::new(names::ENTRY_REMOVE, removed.removed()),
    );
    events.push(
        topics::non_privileged(&queue.id),
        WsEvent::new(names::ENTRY_REMOVE, removed.anonymized()),
    );
    events.commit(tx, &state.bus).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Pin
// ---------------------------------------------------------------------------

/// POST /queues/{id}/entries/{entry_id}/pin
pub async fn pin_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    Path((_, entry_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let entry_id = parse_entry_id(&entry_id)?;
    let queue = &ctx.queue;
    let mut tx = state.pool.begin().await?;

    let mut entry = EntryRepo::get(&mut tx, &entry_id, true)
        .await?
        .ok_or_else(|| AppError::not_found(ENTRY_NOT_FOUND))?;

    let active = EntryRepo::active_for_user(&mut tx, &queue.id, &entry.email).await?;
    if !entry.is_active() && !active.is_empty() {
        return Err(AppError::conflict(
            "That user is already on the queue. Pin their new entry!",
        ));
    }

    EntryRepo::pin(&mut tx, &entry_id).await?;

    entry.active = Some(true);
    entry.pinned = true;
    entry.helped = false;
    entry.removed_at = None;
    entry.removed_by = None;

    tracing::info!(entry_id = %entry.id, "pinned queue entry");

    let mut events = PendingEvents::new();
    events.push(
        topics::admin(&queue.id),
        WsEvent::new(names::STACK_REMOVE, &entry),
    );
    events.push(
        topics::admin(&queue.id),
        WsEvent::new(names::ENTRY_CREATE, &entry),
    );
    events.push(
        topics::non_privileged(&queue.id),
        WsEvent::new(names::ENTRY_CREATE, entry.anonymized()),
    );
    events.push(
        topics::email(&queue.id, &entry.email),
        WsEvent::new(names::ENTRY_UPDATE, &entry),
    );
    events.push(
        topics::email(&queue.id, &entry.email),
        WsEvent::new(names::ENTRY_PINNED, &entry),
    );
    events.commit(tx, &state.bus).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helping
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HelpingQuery {
    helping: Option<String>,
}

/// PUT /queues/{id}/entries/{entry_id}/helping?helping=true|false
pub async fn set_helping(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    identity: Identity,
    Path((_, entry_id)): Path<(String, String)>,
    Query(query): Query<HelpingQuery>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;

    let helping = match query.helping.as_deref() {
        Some("true") => true,
        Some("false") => false,
        other => {
            tracing::warn!(helping = ?other, "unknown helping value");
            return Err(AppError::validation(
                "We couldn't read the helping status from the `helping` query parameter.",
            ));
        }
    };

    let entry_id = parse_entry_id(&entry_id)?;
    let queue = &ctx.queue;
    let mut tx = state.pool.begin().await?;

    let mut entry = EntryRepo::get(&mut tx, &entry_id, true)
        .await?
        .ok_or_else(|| AppError::not_found(ENTRY_NOT_FOUND))?;

    let being_helped_by = if helping {
        format!(" {}", identity.first_name)
    } else {
        String::new()
    };

    EntryRepo::set_helping(&mut tx, &entry_id, &being_helped_by).await?;
    entry.helping = being_helped_by;

    tracing::info!(entry_id = %entry.id, helping, "set helping status");

    let mut events = PendingEvents::new();
    events.push(
        topics::non_privileged(&queue.id),
        WsEvent::new(names::ENTRY_UPDATE, entry.anonymized()),
    );
    events.push(
        topics::admin(&queue.id),
        WsEvent::new(names::ENTRY_UPDATE, &entry),
    );
    events.push(
        topics::email(&queue.id, &entry.email),
        WsEvent::new(names::ENTRY_UPDATE, &entry),
    );
    events.push(
        topics::email(&queue.id, &entry.email),
        WsEvent::new(names::ENTRY_HELPING, &entry),
    );
    events.commit(tx, &state.bus).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Not helped
// ---------------------------------------------------------------------------

/// DELETE /queues/{id}/entries/{entry_id}/helped
///
/// Mark an archived entry as not actually helped, so it does not count
/// against the student's cooldown or daily boost.
pub async fn set_not_helped(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
    Path((_, entry_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let entry_id = parse_entry_id(&entry_id)?;
    let queue = &ctx.queue;
    let mut tx = state.pool.begin().await?;

    let mut entry = EntryRepo::get(&mut tx, &entry_id, true)
        .await?
        .ok_or_else(|| AppError::not_found(ENTRY_NOT_FOUND))?;

    EntryRepo::set_helped(&mut tx, &entry_id, false).await?;
    entry.helped = false;

    tracing::info!(entry_id = %entry.id, "marked entry not helped");

    let mut events = PendingEvents::new();
    events.push(
        topics::admin(&queue.id),
        WsEvent::new(names::ENTRY_UPDATE, entry.removed()),
    );
    events.push(
        topics::email(&queue.id, &entry.email),
        WsEvent::new(names::NOT_HELPED, serde_json::Value::Null),
    );
    events.commit(tx, &state.bus).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Randomize
// ---------------------------------------------------------------------------

/// POST /queues/{id}/entries/randomize
pub async fn randomize_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    _identity: Identity,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let queue = &ctx.queue;
    let mut tx = state.pool.begin().await?;

    EntryRepo::randomize(&mut tx, &queue.id).await?;
    let entries = EntryRepo::active_for_queue(&mut tx, &queue.id).await?;

    let mut events = PendingEvents::new();
    events.push(
        topics::generic(&queue.id),
        WsEvent::new(names::QUEUE_RANDOMIZE, serde_json::Value::Null),
    );
    for entry in &entries {
        events.push(
            topics::admin(&queue.id),
            WsEvent::new(names::ENTRY_UPDATE, entry),
        );
        events.push(
            topics::non_privileged(&queue.id),
            WsEvent::new(names::ENTRY_UPDATE, entry.anonymized()),
        );
    }
    events.commit(tx, &state.bus).await?;

    tracing::info!(entries = entries.len(), "randomized queue");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Clear
// ---------------------------------------------------------------------------

/// DELETE /queues/{id}/entries
///
/// Archive every active entry at once. Admins see who cleared; everyone
/// else just sees the queue empty out.
pub async fn clear_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
    identity: Identity,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;
    let queue = &ctx.queue;
    let mut tx = state.pool.begin().await?;

    EntryRepo::clear(&mut tx, &queue.id, &identity.email).await?;

    tracing::info!("cleared queue");

    let mut events = PendingEvents::new();
    events.push(
        topics::admin(&queue.id),
        WsEvent::new(names::QUEUE_CLEAR, &identity.email),
    );
    events.push(
        topics::non_privileged(&queue.id),
        WsEvent::new(names::QUEUE_CLEAR, serde_json::Value::Null),
    );
    events.commit(tx, &state.bus).await?;

    Ok(StatusCode::NO_CONTENT)
}
