//! Client-ip resolution from `X-Forwarded-For`.
//!
//! The service runs behind a trusted reverse proxy, so the forwarded header
//! is authoritative and its absence outside dev mode is a deployment error,
//! not a client error.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The client ip as resolved from the proxy headers.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

pub async fn real_ip(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let ip = match forwarded {
        Some(ip) if !ip.is_empty() => ip,
        _ if state.config.dev_mode => "127.0.0.1".to_string(),
        _ => {
            tracing::warn!("missing X-Forwarded-For header; the app must sit behind a proxy");
            return Err(AppError::internal("request did not come through the proxy"));
        }
    };

    request.extensions_mut().insert(ClientIp(ip));
    Ok(next.run(request).await)
}
