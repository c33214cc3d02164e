//! Database initialization and migration runner.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module to create the shared SQLx pool and apply the
//! `documents` schema before the Postgres document store accepts traffic.
//!
//! DESIGN
//! ======
//! The pool size arrives as an argument: `AppConfig::from_env` parses
//! `DB_MAX_CONNECTIONS` with the rest of the settings, so nothing here reads
//! the environment. The only migration creates the single JSONB `documents`
//! table (collection, id, data) that `PgDocumentStore` reads and writes; every
//! collection lives in it.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}
