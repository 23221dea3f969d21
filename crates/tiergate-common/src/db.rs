//! Postgres pool and migrations shared by the indexer and API binaries.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

/// Per-statement ceiling applied to every connection. Entity lookups are
/// primary-key reads; anything slower than this is a JSONB scan gone wrong.
const STATEMENT_TIMEOUT: &str = "10s";

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                let statement = format!("SET statement_timeout = '{STATEMENT_TIMEOUT}'");
                conn.execute(statement.as_str()).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Apply the workspace migrations: the `entities` table and `indexer_state`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
