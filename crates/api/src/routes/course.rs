//! Course routes.

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;

use crate::handlers::course;
use crate::middleware::context;
use crate::state::AppState;

/// ```text
/// GET    /courses                 list courses
/// POST   /courses                 create (site admin, rate limited)
/// GET    /courses/{id}            course
/// PUT    /courses/{id}            update (course admin)
/// DELETE /courses/{id}            soft-delete (course admin)
/// GET    /courses/{id}/queues     list queues
/// POST   /courses/{id}/queues     create queue (course admin, rate limited)
/// GET    /courses/{id}/admins     list admins (course admin)
/// POST   /courses/{id}/admins     add admins (course admin)
/// PUT    /courses/{id}/admins     replace admins (course admin)
/// DELETE /courses/{id}/admins     remove admins (course admin)
/// ```
pub fn router(state: &AppState) -> Router<AppState> {
    let scoped = Router::new()
        .route(
            "/",
            get(course::get_course)
                .put(course::update_course)
                .delete(course::delete_course),
        )
        .route("/queues", get(course::get_queues).post(course::add_queue))
        .route(
            "/admins",
            get(course::get_admins)
                .post(course::add_admins)
                .put(course::set_admins)
                .delete(course::remove_admins),
        )
        .layer(from_fn_with_state(state.clone(), context::course_context));

    Router::new()
        .route("/courses", get(course::list_courses).post(course::add_course))
        .nest("/courses/{id}", scoped)
}
