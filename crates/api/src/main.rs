use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ohq_api::auth::oidc::OidcProvider;
use ohq_api::config::ServerConfig;
use ohq_api::middleware::rate_limit::RateLimits;
use ohq_api::router::build_app_router;
use ohq_api::state::AppState;
use ohq_api::ws::Presence;
use ohq_events::EventBus;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ohq_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "loaded server configuration");

    // --- Database ---
    let pool = ohq_db::connect(
        &config.db_host,
        &config.db_database,
        &config.db_username,
        &config.db_password,
    )
    .await
    .expect("failed to connect to database");

    ohq_db::health_check(&pool)
        .await
        .expect("database health check failed");

    ohq_db::run_migrations(&pool)
        .await
        .expect("failed to run database migrations");
    tracing::info!("database ready");

    // --- OIDC ---
    let oidc = OidcProvider::discover(&config.oidc_issuer_url)
        .await
        .expect("failed to discover OIDC provider");
    tracing::info!(issuer = %config.oidc_issuer_url, "OIDC provider discovered");

    // --- State ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        bus: Arc::new(EventBus::default()),
        presence: Arc::new(Presence::default()),
        oidc: Arc::new(oidc),
        limits: Arc::new(RateLimits::default()),
    };

    let app = build_app_router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .expect("http server failed");
}

/// Wait for SIGINT, then let the serve loop stop accepting and drain.
async fn shutdown_signal(state: AppState) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install signal handler");
    tracing::info!(
        subscribers = state.bus.subscriber_count(),
        "shutdown signal received"
    );
}
