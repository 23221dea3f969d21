use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use tiergate_common::{Entity, TiergateError};

use crate::error::ApiResult;
use crate::handlers::normalize_address;
use crate::AppState;

async fn load_entity(state: &AppState, id: &str) -> Result<Option<Entity>, TiergateError> {
    let row: Option<(serde_json::Value,)> =
        sqlx::query_as("SELECT data FROM entities WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    match row {
        Some((data,)) => Ok(Some(serde_json::from_value(data)?)),
        None => Ok(None),
    }
}

/// GET /api/contracts/:address - Contract-scoped entity at the address
pub async fn get_contract(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<Json<Entity>> {
    let address = normalize_address(&address);
    let entity = load_entity(&state, &address)
        .await?
        .ok_or_else(|| TiergateError::NotFound(format!("Contract {} not found", address)))?;

    match entity {
        Entity::Factory(_)
        | Entity::TierContract(_)
        | Entity::Sale(_)
        | Entity::Trust(_)
        | Entity::Escrow(_)
        | Entity::StakeVault(_)
        | Entity::Token(_)
        | Entity::UnknownContract(_) => Ok(Json(entity)),
        other => Err(TiergateError::NotFound(format!(
            "{} is a {} record, not a contract",
            address,
            other.kind()
        ))
        .into()),
    }
}

/// GET /api/contracts/:address/levels - Tier levels of a tier contract,
/// ordered by level
pub async fn get_levels(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<Json<Vec<Entity>>> {
    let address = normalize_address(&address);

    let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
        "SELECT data FROM entities
         WHERE kind = 'TierLevel' AND data->>'contract' = $1
         ORDER BY (data->>'level')::int",
    )
    .bind(&address)
    .fetch_all(&state.pool)
    .await?;

    let levels = rows
        .into_iter()
        .map(|(data,)| serde_json::from_value(data))
        .collect::<Result<Vec<Entity>, _>>()?;

    Ok(Json(levels))
}

/// GET /api/contracts/:address/holders - Per-account tier assignments
pub async fn get_holders(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<Json<Vec<Entity>>> {
    let address = normalize_address(&address);

    let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
        "SELECT data FROM entities
         WHERE kind = 'Holder' AND data->>'contract' = $1
         ORDER BY id",
    )
    .bind(&address)
    .fetch_all(&state.pool)
    .await?;

    let holders = rows
        .into_iter()
        .map(|(data,)| serde_json::from_value(data))
        .collect::<Result<Vec<Entity>, _>>()?;

    Ok(Json(holders))
}
