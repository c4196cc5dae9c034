use std::sync::Arc;

use ohq_events::EventBus;

use crate::auth::oidc::OidcProvider;
use crate::config::ServerConfig;
use crate::middleware::rate_limit::RateLimits;
use crate::ws::Presence;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or is itself a
/// handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. Mutation handlers begin their transaction
    /// from it; context middleware uses it for reads.
    pub pool: ohq_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Topic-addressed event bus feeding the WebSocket connections.
    pub bus: Arc<EventBus>,
    /// Per-queue connection and per-user presence counters.
    pub presence: Arc<Presence>,
    pub oidc: Arc<OidcProvider>,
    /// Named rate-limit buckets.
    pub limits: Arc<RateLimits>,
}
