use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use tiergate_common::{Entity, TiergateError};

use crate::error::ApiResult;
use crate::handlers::{PaginatedResponse, Pagination};
use crate::AppState;

/// GET /api/entities/:id - Look up any entity by its string id
pub async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity>> {
    let row: Option<(serde_json::Value,)> =
        sqlx::query_as("SELECT data FROM entities WHERE id = $1")
            .bind(&id)
            .fetch_optional(&state.pool)
            .await?;

    let data = row.ok_or_else(|| TiergateError::NotFound(format!("Entity {} not found", id)))?;
    let entity: Entity = serde_json::from_value(data.0)?;
    Ok(Json(entity))
}

// Pagination fields are inlined: serde_urlencoded cannot deserialize
// numbers through #[serde(flatten)]
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub kind: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    50
}

impl ListParams {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// GET /api/entities?kind=TierContract - List entities of one kind
pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PaginatedResponse<Entity>>> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities WHERE kind = $1")
        .bind(&params.kind)
        .fetch_one(&state.pool)
        .await?;

    let pagination = params.pagination();
    let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
        "SELECT data FROM entities
         WHERE kind = $1
         ORDER BY id
         LIMIT $2 OFFSET $3",
    )
    .bind(&params.kind)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|(data,)| serde_json::from_value(data))
        .collect::<Result<Vec<Entity>, _>>()?;

    Ok(Json(PaginatedResponse {
        items,
        page: pagination.page,
        limit: pagination.limit(),
        total: total.0,
    }))
}
