use alloy::primitives::{Address, U256};
use bigdecimal::BigDecimal;

use tiergate_common::ids::{address_id, log_scoped_id, participant_id, u256_to_decimal};
use tiergate_common::{
    Entity, StakeAction, StakeEvent, StakeHolder, StakeVault, TiergateError, TokenKind,
};

use crate::events::EventCtx;
use crate::handlers::{ensure_token, MappingContext, ZERO_ADDRESS};

fn placeholder_vault(id: &str) -> StakeVault {
    StakeVault {
        id: id.to_string(),
        deployer: ZERO_ADDRESS.to_string(),
        deploy_block: 0,
        deploy_timestamp: 0,
        factory: None,
        token: None,
        total_staked: BigDecimal::from(0),
        events: Vec::new(),
        holder_count: 0,
    }
}

/// Vault configuration via the shared Initialized signature: only the
/// staked token is meaningful here.
pub async fn handle_initialized(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    token: Address,
) -> Result<(), TiergateError> {
    let vault_id = address_id(ctx.contract);
    let mut vault = match cx.store.load(&vault_id).await? {
        Some(Entity::StakeVault(v)) => v,
        _ => placeholder_vault(&vault_id),
    };

    let mut batch = Vec::new();
    if token != Address::ZERO {
        let (token_id, token_entity) =
            ensure_token(cx, token, TokenKind::Erc20, ctx.block_number).await?;
        vault.token = Some(token_id);
        batch.extend(token_entity);
    }

    batch.push(Entity::StakeVault(vault));
    cx.store.save_all(batch).await
}

pub async fn handle_stake(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    staker: Address,
    amount: U256,
    is_stake: bool,
) -> Result<(), TiergateError> {
    let record_id = log_scoped_id(ctx.tx_hash, ctx.contract, ctx.log_index);
    if cx.store.load(&record_id).await?.is_some() {
        return Ok(());
    }

    let vault_id = address_id(ctx.contract);
    let staker_id = address_id(staker);

    let mut vault = match cx.store.load(&vault_id).await? {
        Some(Entity::StakeVault(v)) => v,
        _ => placeholder_vault(&vault_id),
    };

    let holder_key = participant_id(&vault_id, &staker_id);
    let (mut holder, is_new) = match cx.store.load(&holder_key).await? {
        Some(Entity::StakeHolder(h)) => (h, false),
        _ => (
            StakeHolder {
                id: holder_key,
                vault: vault_id.clone(),
                account: staker_id.clone(),
                balance: BigDecimal::from(0),
                events: Vec::new(),
            },
            true,
        ),
    };

    let amount = u256_to_decimal(amount);
    let record = StakeEvent {
        id: record_id.clone(),
        vault: vault_id,
        staker: staker_id,
        action: if is_stake {
            StakeAction::Stake
        } else {
            StakeAction::Unstake
        },
        amount: amount.clone(),
        block: ctx.block_number as i64,
        timestamp: ctx.timestamp as i64,
    };

    if is_stake {
        vault.total_staked += &amount;
        holder.balance += &amount;
    } else {
        vault.total_staked -= &amount;
        holder.balance -= &amount;
    }
    if is_new {
        vault.holder_count += 1;
    }
    vault.events.push(record_id.clone());
    holder.events.push(record_id);

    cx.store
        .save_all(vec![
            Entity::StakeEvent(record),
            Entity::StakeHolder(holder),
            Entity::StakeVault(vault),
        ])
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use tiergate_common::network::NetworkConfig;

    use crate::metadata::{FixedMetadataSource, MetadataPolicy};
    use crate::store::{EntityStore, MemoryStore};

    const VAULT: u8 = 0xF0;

    fn ctx(tx: u8) -> EventCtx {
        EventCtx {
            contract: Address::with_last_byte(VAULT),
            tx_hash: B256::with_last_byte(tx),
            log_index: 0,
            block_number: 30,
            timestamp: 1_700_000_030,
        }
    }

    #[tokio::test]
    async fn stake_and_unstake_track_totals() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = NetworkConfig {
            network: "test".into(),
            start_block: 0,
            factories: vec![],
        };
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        let alice = Address::with_last_byte(0xA1);
        let bob = Address::with_last_byte(0xB1);
        handle_stake(&cx, &ctx(1), alice, U256::from(100), true).await.unwrap();
        handle_stake(&cx, &ctx(2), bob, U256::from(40), true).await.unwrap();
        handle_stake(&cx, &ctx(3), alice, U256::from(25), false).await.unwrap();

        let vault_id = address_id(Address::with_last_byte(VAULT));
        match store.load(&vault_id).await.unwrap().unwrap() {
            Entity::StakeVault(v) => {
                assert_eq!(v.total_staked, BigDecimal::from(115));
                assert_eq!(v.holder_count, 2);
                assert_eq!(v.events.len(), 3);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }

        let alice_id = participant_id(&vault_id, &address_id(alice));
        match store.load(&alice_id).await.unwrap().unwrap() {
            Entity::StakeHolder(h) => {
                assert_eq!(h.balance, BigDecimal::from(75));
                assert_eq!(h.events.len(), 2);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn initialize_links_staked_token() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = NetworkConfig {
            network: "test".into(),
            start_block: 0,
            factories: vec![],
        };
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        let token = Address::with_last_byte(0x70);
        handle_initialized(&cx, &ctx(1), token).await.unwrap();
        handle_stake(&cx, &ctx(2), Address::with_last_byte(0xA1), U256::from(50), true)
            .await
            .unwrap();

        let vault_id = address_id(Address::with_last_byte(VAULT));
        match store.load(&vault_id).await.unwrap().unwrap() {
            Entity::StakeVault(v) => {
                assert_eq!(v.token, Some(address_id(token)));
                assert_eq!(v.total_staked, BigDecimal::from(50));
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
        assert!(store.load(&address_id(token)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = NetworkConfig {
            network: "test".into(),
            start_block: 0,
            factories: vec![],
        };
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        let alice = Address::with_last_byte(0xA1);
        for _ in 0..2 {
            handle_stake(&cx, &ctx(1), alice, U256::from(100), true).await.unwrap();
        }

        let vault_id = address_id(Address::with_last_byte(VAULT));
        match store.load(&vault_id).await.unwrap().unwrap() {
            Entity::StakeVault(v) => {
                assert_eq!(v.total_staked, BigDecimal::from(100));
                assert_eq!(v.events.len(), 1);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
    }
}
