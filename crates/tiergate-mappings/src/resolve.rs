//! Known-vs-unknown contract classification.
//!
//! An address is "known" when a primary contract record already exists for
//! it, which in practice means it was deployed through a tracked factory
//! (or a defensive placeholder was created earlier). Resolution is an
//! explicit sum type so callers pattern-match instead of null-checking.

use alloy::primitives::Address;

use tiergate_common::ids::address_id;
use tiergate_common::{Entity, Escrow, Sale, StakeVault, TierContract, TiergateError, Trust};

use crate::store::EntityStore;

#[derive(Debug, Clone)]
pub enum KnownContract {
    Tier(TierContract),
    Sale(Sale),
    Trust(Trust),
    Escrow(Escrow),
    Stake(StakeVault),
}

#[derive(Debug, Clone)]
pub enum Resolved {
    Known(KnownContract),
    /// No primary record for this address; carries the normalized id.
    Unknown(String),
}

pub async fn resolve_contract(
    store: &dyn EntityStore,
    address: Address,
) -> Result<Resolved, TiergateError> {
    let id = address_id(address);
    let resolved = match store.load(&id).await? {
        Some(Entity::TierContract(e)) => Resolved::Known(KnownContract::Tier(e)),
        Some(Entity::Sale(e)) => Resolved::Known(KnownContract::Sale(e)),
        Some(Entity::Trust(e)) => Resolved::Known(KnownContract::Trust(e)),
        Some(Entity::Escrow(e)) => Resolved::Known(KnownContract::Escrow(e)),
        Some(Entity::StakeVault(e)) => Resolved::Known(KnownContract::Stake(e)),
        // A token or factory record at this address is not a primary
        // event-emitting contract record
        Some(_) | None => Resolved::Unknown(id),
    };
    Ok(resolved)
}
