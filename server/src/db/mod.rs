//! Database Layer
//!
//! `PostgreSQL` connection plus the document-store abstraction the
//! service is written against. Production runs on [`PgStore`]; tests
//! run on [`MemoryStore`].

pub mod memory;
pub mod postgres;
pub mod store;


use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    new_object_id, Clause, Document, DocumentStore, Filter, FindOptions, Order, StoreError,
};

/// Collection holding moderation records and admin grants, keyed by
/// caller identity.
pub const USERS_COLLECTION: &str = "users";

/// Create `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        // Keep minimum connections warm to prevent cold-start latency
        .min_connections(2)
        .max_connections(10)
        // Prevent hanging requests on pool exhaustion
        .acquire_timeout(Duration::from_secs(5))
        // Clean up idle connections to prevent stale connection issues
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}
