//! Postgres persistence for the queue service.
//!
//! Row models live in [`models`], data access in [`repositories`].
//! Repository methods take `&mut PgConnection` so each HTTP request can run
//! all of its store calls on one transaction; handlers never touch the pool
//! directly for mutations.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Build the connection URL from its parts and open a pool.
pub async fn connect(
    host: &str,
    database: &str,
    username: &str,
    password: &str,
) -> Result<DbPool, sqlx::Error> {
    let url = format!("postgres://{username}:{password}@{host}/{database}");
    PgPoolOptions::new().max_connections(20).connect(&url).await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
