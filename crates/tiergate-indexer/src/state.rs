//! Sync/health state in the `indexer_state` table, read by the status
//! endpoint and the test harness.

use sqlx::PgPool;

pub const LAST_INDEXED_BLOCK: &str = "last_indexed_block";
pub const HEALTHY: &str = "healthy";
pub const FATAL_ERROR: &str = "fatal_error";

async fn set(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO indexer_state (key, value, updated_at)
         VALUES ($1, $2, NOW())
         ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM indexer_state WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v))
}

pub async fn set_last_indexed_block(pool: &PgPool, block: u64) -> Result<(), sqlx::Error> {
    set(pool, LAST_INDEXED_BLOCK, &block.to_string()).await
}

pub async fn last_indexed_block(pool: &PgPool) -> Result<Option<u64>, sqlx::Error> {
    Ok(get(pool, LAST_INDEXED_BLOCK).await?.and_then(|v| v.parse().ok()))
}

/// A run that reaches this point has made it past whatever stopped the
/// previous one, so any recorded fatal error is stale and gets cleared.
pub async fn mark_healthy(pool: &PgPool) -> Result<(), sqlx::Error> {
    set(pool, HEALTHY, "true").await?;
    sqlx::query("DELETE FROM indexer_state WHERE key = $1")
        .bind(FATAL_ERROR)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a non-recoverable mapping failure. The run stops here; the status
/// endpoint surfaces the message until the operator intervenes.
pub async fn mark_fatal(pool: &PgPool, message: &str) -> Result<(), sqlx::Error> {
    set(pool, HEALTHY, "false").await?;
    set(pool, FATAL_ERROR, message).await
}
