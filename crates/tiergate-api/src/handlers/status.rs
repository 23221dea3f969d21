use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::AppState;

/// Status document polled by the test harness: sync progress plus the
/// fatal-error marker the indexer leaves behind when a mapping fails.
#[derive(Serialize)]
pub struct IndexerStatus {
    pub healthy: bool,
    pub fatal_error: Option<String>,
    pub last_indexed_block: i64,
    pub indexed_at: Option<String>,
}

/// GET /status
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<IndexerStatus>> {
    let rows: Vec<(String, String, chrono::DateTime<chrono::Utc>)> =
        sqlx::query_as("SELECT key, value, updated_at FROM indexer_state")
            .fetch_all(&state.pool)
            .await?;

    let mut status = IndexerStatus {
        // No state rows yet means the indexer has not started; report
        // unhealthy rather than a spurious all-clear
        healthy: false,
        fatal_error: None,
        last_indexed_block: 0,
        indexed_at: None,
    };

    for (key, value, updated_at) in rows {
        match key.as_str() {
            "healthy" => status.healthy = value == "true",
            "fatal_error" => status.fatal_error = Some(value),
            "last_indexed_block" => {
                status.last_indexed_block = value.parse().unwrap_or(0);
                status.indexed_at = Some(updated_at.to_rfc3339());
            }
            _ => {}
        }
    }

    Ok(Json(status))
}
