//! HTTP handlers, one module per resource.
//!
//! Mutation handlers run their store calls on a transaction begun from the
//! pool and queue their events in a [`crate::publish::PendingEvents`]
//! buffer; the buffer flushes to the bus only after commit.

pub mod announcement;
pub mod course;
pub mod entry;
pub mod health;
pub mod oauth;
pub mod queue;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::{AppError, AppResult};

/// Unwrap a JSON body, mapping malformed input to the standard 400 message.
pub(crate) fn read_body<T>(body: Result<Json<T>, JsonRejection>, what: &str) -> AppResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::warn!(what, error = %rejection, "failed to decode request body");
            Err(AppError::validation(format!(
                "We couldn't read the {what} from the request body."
            )))
        }
    }
}
