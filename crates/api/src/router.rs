//! Shared application router builder.
//!
//! Both the production binary and the integration tests assemble the app
//! here, so they exercise the same middleware stack.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::real_ip::{self, ClientIp};
use crate::routes;
use crate::state::AppState;

/// Request timeout. The WebSocket upgrade response completes within this;
/// the upgraded connection itself is not subject to it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Time-ordered request ids, echoed back in `X-Request-ID`.
#[derive(Debug, Clone, Copy)]
struct MakeRequestKsuid;

impl MakeRequestId for MakeRequestKsuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = ohq_core::Id::generate();
        HeaderValue::from_str(id.as_str()).ok().map(RequestId::new)
    }
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let ip = request
        .extensions()
        .get::<ClientIp>()
        .map(|c| c.0.as_str())
        .unwrap_or("");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
        ip,
    )
}

/// Build the full application [`Router`].
///
/// The stack, outermost first: request-id injection and propagation,
/// real-ip resolution, structured tracing (span carries the request id and
/// ip), request timeout, panic recovery, then the routes. Identity,
/// capability, and rate limiting are handled per route.
pub fn build_app_router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    routes::api_routes(&state)
        .fallback(fallback)
        // -- Middleware (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            real_ip::real_ip,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestKsuid))
        .with_state(state)
}

async fn fallback() -> AppError {
    AppError::not_found("There's nothing here.")
}
