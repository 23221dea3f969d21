use alloy::primitives::{Address, U256};

use tiergate_common::ids::{address_id, level_id, participant_id, tx_scoped_id, u256_to_decimal};
use tiergate_common::{
    Entity, Holder, TierChange, TierContract, TierLevel, TierVariant, TiergateError, TokenKind,
};

use crate::events::EventCtx;
use crate::handlers::{ensure_token, MappingContext, ZERO_ADDRESS};

/// Tier levels form a fixed closed set.
pub const MAX_TIER: i32 = 8;

/// A tier contract not deployed through a tracked factory still gets a
/// primary record: zeroed deploy metadata, no factory, no variant.
fn placeholder_contract(id: &str) -> TierContract {
    TierContract {
        id: id.to_string(),
        variant: None,
        deployer: ZERO_ADDRESS.to_string(),
        deploy_block: 0,
        deploy_timestamp: 0,
        factory: None,
        threshold: None,
        token: None,
        verifier: None,
        combined: Vec::new(),
        tier_changes: Vec::new(),
        member_count: 0,
    }
}

async fn load_contract(
    cx: &MappingContext<'_>,
    id: &str,
) -> Result<TierContract, TiergateError> {
    match cx.store.load(id).await? {
        Some(Entity::TierContract(t)) => Ok(t),
        _ => Ok(placeholder_contract(id)),
    }
}

fn tier_value(raw: U256, field: &str) -> Result<i32, TiergateError> {
    let value: i32 = raw
        .try_into()
        .map_err(|_| TiergateError::MalformedEvent(format!("{field} out of range: {raw}")))?;
    if !(0..=MAX_TIER).contains(&value) {
        return Err(TiergateError::MalformedEvent(format!(
            "{field} outside 0..={MAX_TIER}: {value}"
        )));
    }
    Ok(value)
}

/// Configure a tier contract: link its gating token and verifier, set the
/// threshold, and pre-enumerate the level records 0..=8.
pub async fn handle_initialized(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    token: Address,
    verifier: Address,
    threshold: U256,
) -> Result<(), TiergateError> {
    let contract_id = address_id(ctx.contract);
    let mut contract = load_contract(cx, &contract_id).await?;

    let mut batch = Vec::new();

    if token != Address::ZERO {
        // Transfer-variant contracts gate on an NFT; everything else on an
        // ERC-20 balance
        let kind = match contract.variant {
            Some(TierVariant::Transfer) => TokenKind::Erc721,
            _ => TokenKind::Erc20,
        };
        let (token_id, token_entity) = ensure_token(cx, token, kind, ctx.block_number).await?;
        contract.token = Some(token_id);
        batch.extend(token_entity);
    }

    if verifier != Address::ZERO {
        contract.verifier = Some(address_id(verifier));
    }
    contract.threshold = Some(u256_to_decimal(threshold));

    // Bounded level id space, created up front; lazily created levels from
    // an out-of-order TierChange keep their counts
    for level in 0..=MAX_TIER {
        let id = level_id(&contract_id, level);
        if cx.store.load(&id).await?.is_none() {
            batch.push(Entity::TierLevel(TierLevel {
                id,
                contract: contract_id.clone(),
                level,
                member_count: 0,
            }));
        }
    }

    batch.push(Entity::TierContract(contract));
    cx.store.save_all(batch).await
}

/// Combine-variant contracts reference their sub-tier contracts.
pub async fn handle_sub_tier_added(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    tier_contract: Address,
) -> Result<(), TiergateError> {
    let contract_id = address_id(ctx.contract);
    let mut contract = load_contract(cx, &contract_id).await?;

    let sub_id = address_id(tier_contract);
    if !contract.combined.contains(&sub_id) {
        contract.combined.push(sub_id);
        cx.store.save_all(vec![Entity::TierContract(contract)]).await?;
    }
    Ok(())
}

/// One account moved between tiers. Writes the immutable change record,
/// appends it to the contract and holder lists, and moves exactly one
/// membership count from the origin level to the destination level.
pub async fn handle_tier_change(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    sender: Address,
    account: Address,
    start_tier: U256,
    end_tier: U256,
) -> Result<(), TiergateError> {
    let record_id = tx_scoped_id(ctx.tx_hash, ctx.contract);
    if cx.store.load(&record_id).await?.is_some() {
        // Replay of an already-processed transaction
        return Ok(());
    }

    let start = tier_value(start_tier, "startTier")?;
    let end = tier_value(end_tier, "endTier")?;

    let contract_id = address_id(ctx.contract);
    let account_id = address_id(account);
    let mut contract = load_contract(cx, &contract_id).await?;

    let record = TierChange {
        id: record_id.clone(),
        contract: contract_id.clone(),
        sender: address_id(sender),
        account: account_id.clone(),
        start_tier: start,
        end_tier: end,
        block: ctx.block_number as i64,
        timestamp: ctx.timestamp as i64,
    };

    let holder_id = participant_id(&contract_id, &account_id);
    let existing_holder = match cx.store.load(&holder_id).await? {
        Some(Entity::Holder(h)) => Some(h),
        _ => None,
    };
    let first_assignment = existing_holder.is_none();
    let mut holder = existing_holder.unwrap_or_else(|| Holder {
        id: holder_id,
        contract: contract_id.clone(),
        account: account_id,
        tier: end,
        changes: Vec::new(),
    });
    holder.tier = end;
    holder.changes.push(record_id.clone());

    contract.tier_changes.push(record_id);
    if first_assignment {
        contract.member_count += 1;
    }

    let mut batch: Vec<Entity> = vec![Entity::TierChange(record)];

    let mut end_level = load_level(cx, &contract_id, end).await?;
    if start == end {
        // Re-assignment within one level; both adjustments hit the same
        // record, so apply them to one instance
        if !first_assignment {
            end_level.member_count -= 1;
        }
        end_level.member_count += 1;
        batch.push(Entity::TierLevel(end_level));
    } else {
        if !first_assignment {
            let mut start_level = load_level(cx, &contract_id, start).await?;
            start_level.member_count = (start_level.member_count - 1).max(0);
            batch.push(Entity::TierLevel(start_level));
        }
        end_level.member_count += 1;
        batch.push(Entity::TierLevel(end_level));
    }

    batch.push(Entity::Holder(holder));
    batch.push(Entity::TierContract(contract));
    cx.store.save_all(batch).await
}

async fn load_level(
    cx: &MappingContext<'_>,
    contract: &str,
    level: i32,
) -> Result<TierLevel, TiergateError> {
    let id = level_id(contract, level);
    match cx.store.load(&id).await? {
        Some(Entity::TierLevel(l)) => Ok(l),
        _ => Ok(TierLevel {
            id,
            contract: contract.to_string(),
            level,
            member_count: 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use tiergate_common::network::NetworkConfig;

    use crate::metadata::{FixedMetadataSource, MetadataPolicy, TokenMetadata};
    use crate::store::{EntityStore, MemoryStore};

    const CONTRACT: u8 = 0xC0;

    fn network() -> NetworkConfig {
        NetworkConfig {
            network: "test".into(),
            start_block: 0,
            factories: vec![],
        }
    }

    fn ctx(tx: u8, block: u64) -> EventCtx {
        EventCtx {
            contract: Address::with_last_byte(CONTRACT),
            tx_hash: B256::with_last_byte(tx),
            log_index: 0,
            block_number: block,
            timestamp: 1_700_000_000 + block,
        }
    }

    async fn level_count(store: &MemoryStore, level: i32) -> i64 {
        let contract_id = address_id(Address::with_last_byte(CONTRACT));
        match store.load(&level_id(&contract_id, level)).await.unwrap() {
            Some(Entity::TierLevel(l)) => l.member_count,
            _ => 0,
        }
    }

    #[tokio::test]
    async fn initialize_links_token_and_enumerates_levels() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let token = Address::with_last_byte(0x70);
        metadata.insert(
            token,
            TokenMetadata {
                name: Some("Gate".into()),
                symbol: Some("GATE".into()),
                decimals: Some(18),
                total_supply: None,
            },
        );
        let network = network();
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        handle_initialized(
            &cx,
            &ctx(1, 10),
            token,
            Address::with_last_byte(0x71),
            U256::from(500),
        )
        .await
        .unwrap();

        let contract_id = address_id(Address::with_last_byte(CONTRACT));
        match store.load(&contract_id).await.unwrap().unwrap() {
            Entity::TierContract(t) => {
                assert_eq!(t.token, Some(address_id(token)));
                assert_eq!(t.verifier, Some(address_id(Address::with_last_byte(0x71))));
                assert_eq!(t.threshold.unwrap().to_string(), "500");
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
        match store.load(&address_id(token)).await.unwrap().unwrap() {
            Entity::Token(t) => assert_eq!(t.symbol.as_deref(), Some("GATE")),
            other => panic!("wrong kind: {}", other.kind()),
        }
        // Levels 0..=8 pre-enumerated
        for level in 0..=MAX_TIER {
            assert!(store
                .load(&level_id(&contract_id, level))
                .await
                .unwrap()
                .is_some());
        }
    }

    #[tokio::test]
    async fn upgrade_then_downgrade_moves_one_count() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = network();
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        let user = Address::with_last_byte(0x01);
        handle_tier_change(&cx, &ctx(1, 1), user, user, U256::ZERO, U256::from(5))
            .await
            .unwrap();
        assert_eq!(level_count(&store, 5).await, 1);

        handle_tier_change(&cx, &ctx(2, 2), user, user, U256::from(5), U256::from(4))
            .await
            .unwrap();
        assert_eq!(level_count(&store, 5).await, 0);
        assert_eq!(level_count(&store, 4).await, 1);
    }

    #[tokio::test]
    async fn level_counts_conserve_distinct_accounts() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = network();
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        // Three accounts, several transitions each
        let moves: &[(u8, u64, u64)] = &[
            (0x01, 0, 3),
            (0x02, 0, 3),
            (0x01, 3, 7),
            (0x03, 0, 1),
            (0x02, 3, 3),
            (0x01, 7, 2),
        ];
        for (i, (user, from, to)) in moves.iter().enumerate() {
            let user = Address::with_last_byte(*user);
            handle_tier_change(
                &cx,
                &ctx(i as u8 + 1, i as u64),
                user,
                user,
                U256::from(*from),
                U256::from(*to),
            )
            .await
            .unwrap();
        }

        let mut total = 0;
        for level in 0..=MAX_TIER {
            total += level_count(&store, level).await;
        }
        assert_eq!(total, 3);

        let contract_id = address_id(Address::with_last_byte(CONTRACT));
        match store.load(&contract_id).await.unwrap().unwrap() {
            Entity::TierContract(t) => {
                assert_eq!(t.member_count, 3);
                assert_eq!(t.tier_changes.len(), 6);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn replaying_a_change_is_idempotent() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = network();
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        let user = Address::with_last_byte(0x01);
        for _ in 0..3 {
            handle_tier_change(&cx, &ctx(1, 1), user, user, U256::ZERO, U256::from(5))
                .await
                .unwrap();
        }

        assert_eq!(level_count(&store, 5).await, 1);
        let contract_id = address_id(Address::with_last_byte(CONTRACT));
        match store.load(&contract_id).await.unwrap().unwrap() {
            Entity::TierContract(t) => {
                assert_eq!(t.member_count, 1);
                assert_eq!(t.tier_changes.len(), 1);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn change_round_trips_event_parameters() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = network();
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        let sender = Address::with_last_byte(0xAA);
        let account = Address::with_last_byte(0xBB);
        let c = ctx(9, 77);
        handle_tier_change(&cx, &c, sender, account, U256::from(2), U256::from(6))
            .await
            .unwrap();

        let record_id = tx_scoped_id(c.tx_hash, c.contract);
        match store.load(&record_id).await.unwrap().unwrap() {
            Entity::TierChange(r) => {
                assert_eq!(r.sender, address_id(sender));
                assert_eq!(r.account, address_id(account));
                assert_eq!(r.start_tier, 2);
                assert_eq!(r.end_tier, 6);
                assert_eq!(r.block, 77);
                assert_eq!(r.timestamp, 1_700_000_000 + 77);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn out_of_range_tier_is_malformed() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = network();
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        let user = Address::with_last_byte(0x01);
        let err = handle_tier_change(&cx, &ctx(1, 1), user, user, U256::ZERO, U256::from(9))
            .await
            .unwrap_err();
        assert!(matches!(err, TiergateError::MalformedEvent(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn change_before_initialize_creates_placeholder() {
        let store = MemoryStore::new();
        let metadata = FixedMetadataSource::new();
        let network = network();
        let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

        let user = Address::with_last_byte(0x01);
        handle_tier_change(&cx, &ctx(1, 1), user, user, U256::ZERO, U256::from(3))
            .await
            .unwrap();

        let contract_id = address_id(Address::with_last_byte(CONTRACT));
        match store.load(&contract_id).await.unwrap().unwrap() {
            Entity::TierContract(t) => {
                assert_eq!(t.variant, None);
                assert_eq!(t.factory, None);
                assert_eq!(t.deploy_block, 0);
                assert_eq!(t.member_count, 1);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }

        // Initialize arriving later keeps the lazily created level count
        handle_initialized(&cx, &ctx(2, 2), Address::ZERO, Address::ZERO, U256::ZERO)
            .await
            .unwrap();
        assert_eq!(level_count(&store, 3).await, 1);
    }
}
