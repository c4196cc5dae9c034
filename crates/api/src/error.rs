use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ohq_core::CoreError;
use serde_json::json;

use crate::auth::session;

/// Application-level error type for HTTP handlers.
///
/// Expected denials are [`AppError::Status`] with a user-facing message;
/// [`CoreError`]s from validation propagate with their own status mapping;
/// everything else (including store failures) becomes a generic 500 whose
/// detail is logged, never sent to the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An expected denial: the status and the exact message for the client.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("rate limited until {reset}")]
    RateLimited { reset: u64 },
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::status(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::status(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::status(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::status(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Core(CoreError::Internal(message.into()))
    }
}

/// Whether a store error is a unique-constraint violation (used to surface
/// signup races as 409 rather than 500).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

const GENERIC_INTERNAL: &str = "Something went wrong on our end. Please try again.";
const GENERIC_NOT_FOUND: &str = "We couldn't find what you were looking for.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Status { status, message } => (*status, message.clone()),

            AppError::Core(core) => match core {
                CoreError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, GENERIC_NOT_FOUND.to_string())
                }
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        GENERIC_INTERNAL.to_string(),
                    )
                }
            },

            AppError::Database(err) => classify_sqlx_error(err),

            AppError::RateLimited { reset } => {
                let body = json!({
                    "message": "Whoa, slow down! You're making too many requests."
                });
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("X-RateLimit-Reset", reset.to_string())],
                    axum::Json(body),
                )
                    .into_response();
            }
        };

        let body = axum::Json(json!({ "message": message }));

        // An unauthenticated response always invalidates the session cookie
        // so a broken cookie cannot wedge the client.
        if status == StatusCode::UNAUTHORIZED {
            return (status, [(SET_COOKIE, session::expired_cookie())], body).into_response();
        }

        (status, body).into_response()
    }
}

fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, GENERIC_NOT_FOUND.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => (
            StatusCode::CONFLICT,
            "That conflicts with something that already exists.".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_INTERNAL.to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn denials_map_to_their_status_codes() {
        assert_eq!(status_of(AppError::validation("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AppError::unauthorized("who?")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(AppError::forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AppError::not_found("gone")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AppError::conflict("dup")), StatusCode::CONFLICT);
        assert_eq!(
            status_of(AppError::internal("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_404() {
        assert_eq!(
            status_of(AppError::Database(sqlx::Error::RowNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn rate_limited_sets_the_reset_header() {
        let response = AppError::RateLimited { reset: 1_750_000_000 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("X-RateLimit-Reset").unwrap(),
            "1750000000"
        );
    }

    #[test]
    fn unauthorized_invalidates_the_session_cookie() {
        let response = AppError::unauthorized("expired").into_response();
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .expect("401 must clear the session cookie")
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let response = AppError::internal("secret backend detail").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
