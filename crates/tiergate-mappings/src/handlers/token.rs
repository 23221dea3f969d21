use alloy::primitives::Address;

use tiergate_common::ids::{address_id, u256_to_decimal};
use tiergate_common::{Entity, TiergateError, Token, TokenKind};

use crate::handlers::MappingContext;
use crate::metadata::MetadataPolicy;

/// Make sure a token record exists for `address`, fetching metadata at
/// first sight (or on every reference under `AlwaysRefresh`).
///
/// Returns the token id plus the entity to include in the caller's save
/// batch when a write is needed. A metadata fetch that fails leaves the
/// optional fields None; it never fails the caller.
pub async fn ensure_token(
    cx: &MappingContext<'_>,
    address: Address,
    kind: TokenKind,
    block: u64,
) -> Result<(String, Option<Entity>), TiergateError> {
    let id = address_id(address);

    let existing = match cx.store.load(&id).await? {
        Some(Entity::Token(token)) => Some(token),
        // An address already holding a non-token record is left alone;
        // the reference still points at it by id
        Some(_) => return Ok((id, None)),
        None => None,
    };

    if existing.is_some() && cx.policy == MetadataPolicy::FetchOnce {
        return Ok((id, None));
    }

    let fetched = cx.metadata.fetch(address, kind).await;
    if fetched.name.is_none() && fetched.symbol.is_none() {
        tracing::debug!(token = %id, "token metadata unavailable, storing nulled record");
    }

    let token = Token {
        id: id.clone(),
        token_kind: kind,
        name: fetched.name,
        symbol: fetched.symbol,
        decimals: fetched.decimals.map(i32::from),
        total_supply: fetched.total_supply.map(u256_to_decimal),
        first_seen_block: existing
            .as_ref()
            .map(|t| t.first_seen_block)
            .unwrap_or(block as i64),
    };

    Ok((id, Some(Entity::Token(token))))
}
