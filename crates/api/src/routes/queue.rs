//! Routes scoped to a single queue.
//!
//! Everything under `/queues/{id}` runs behind the queue-context middleware,
//! which resolves the queue and the viewer's course-admin capability once
//! per request.

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{announcement, entry, queue};
use crate::middleware::context;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/queues/{id}`.
///
/// ```text
/// GET    /                                   queue snapshot (richer for admins)
/// PUT    /                                   rename/relocate (admin)
/// DELETE /                                   soft-delete (admin)
/// GET    /ws                                 WebSocket upgrade
/// GET    /stack                              archived entries (admin)
/// POST   /entries                            sign up (rate limited)
/// DELETE /entries                            clear the queue (admin)
/// POST   /entries/randomize                  randomize priorities (admin)
/// PUT    /entries/{entry_id}                 owner edit
/// DELETE /entries/{entry_id}                 remove (owner or admin)
/// POST   /entries/{entry_id}/pin             pin (admin)
/// PUT    /entries/{entry_id}/helping         set helping (admin)
/// DELETE /entries/{entry_id}/helped          mark not helped (admin)
/// POST   /announcements                      create (admin)
/// DELETE /announcements/{announcement_id}    delete (admin)
/// GET    /schedule                           week schedule
/// PUT    /schedule                           replace week (admin)
/// GET    /configuration                      configuration
/// PUT    /configuration                      update configuration (admin)
/// PUT    /configuration/manual-open          flip the manual flag (admin)
/// POST   /messages                           broadcast/DM (admin)
/// GET    /roster                             roster (admin)
/// GET    /groups                             groups (admin)
/// PUT    /groups                             replace groups + roster (admin)
/// ```
pub fn router(state: &AppState) -> Router<AppState> {
    let scoped = Router::new()
        .route(
            "/",
            get(queue::get_queue)
                .put(queue::update_queue)
                .delete(queue::remove_queue),
        )
        .route("/ws", get(ws::queue_websocket))
        .route("/stack", get(queue::get_stack))
        .route(
            "/entries",
            post(entry::add_entry).delete(entry::clear_entries),
        )
        .route("/entries/randomize", post(entry::randomize_entries))
        .route(
            "/entries/{entry_id}",
            put(entry::update_entry).delete(entry::remove_entry),
        )
        .route("/entries/{entry_id}/pin", post(entry::pin_entry))
        .route("/entries/{entry_id}/helping", put(entry::set_helping))
        .route("/entries/{entry_id}/helped", delete(entry::set_not_helped))
        .route("/announcements", post(announcement::add_announcement))
        .route(
            "/announcements/{announcement_id}",
            delete(announcement::remove_announcement),
        )
        .route(
            "/schedule",
            get(queue::get_schedule).put(queue::update_schedule),
        )
        .route(
            "/configuration",
            get(queue::get_configuration).put(queue::update_configuration),
        )
        .route("/configuration/manual-open", put(queue::update_open_status))
        .route("/messages", post(queue::send_message))
        .route("/roster", get(queue::get_roster))
        .route("/groups", get(queue::get_groups).put(queue::update_groups))
        .layer(from_fn_with_state(state.clone(), context::queue_context));

    Router::new().nest("/queues/{id}", scoped)
}
