//! Postgres persistence for the property catalog.
//!
//! - [`models`] -- `FromRow` row structs and their conversion into domain types.
//! - [`repositories`] -- one unit struct per table with async query functions.
//! - [`store::PgCatalogStore`] -- implements the catalog storage ports.
//! - [`sinks`] -- audit and notification collaborators backed by tables.

pub mod models;
pub mod repositories;
pub mod sinks;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use sinks::{PgAuditSink, PgNotifier};
pub use store::PgCatalogStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
