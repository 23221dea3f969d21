use alloy::primitives::{Address, U256};
use bigdecimal::BigDecimal;

use tiergate_common::ids::{address_id, log_scoped_id, participant_id, u256_to_decimal};
use tiergate_common::{Entity, TiergateError, Trust, TrustAction, TrustEvent, TrustParticipant};

use crate::events::EventCtx;
use crate::handlers::{MappingContext, ZERO_ADDRESS};

fn placeholder_trust(id: &str) -> Trust {
    Trust {
        id: id.to_string(),
        deployer: ZERO_ADDRESS.to_string(),
        deploy_block: 0,
        deploy_timestamp: 0,
        factory: None,
        currency_pool: BigDecimal::from(0),
        token_pool: BigDecimal::from(0),
        deposits: Vec::new(),
        withdrawals: Vec::new(),
        swaps: Vec::new(),
        participant_count: 0,
    }
}

async fn load_trust(cx: &MappingContext<'_>, id: &str) -> Result<Trust, TiergateError> {
    match cx.store.load(id).await? {
        Some(Entity::Trust(t)) => Ok(t),
        _ => Ok(placeholder_trust(id)),
    }
}

async fn load_participant(
    cx: &MappingContext<'_>,
    trust: &str,
    account: &str,
) -> Result<(TrustParticipant, bool), TiergateError> {
    let id = participant_id(trust, account);
    match cx.store.load(&id).await? {
        Some(Entity::TrustParticipant(p)) => Ok((p, false)),
        _ => Ok((
            TrustParticipant {
                id,
                trust: trust.to_string(),
                account: account.to_string(),
                balance: BigDecimal::from(0),
                events: Vec::new(),
            },
            true,
        )),
    }
}

pub async fn handle_deposit(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    sender: Address,
    amount: U256,
) -> Result<(), TiergateError> {
    apply_movement(cx, ctx, sender, TrustAction::Deposit, amount, None).await
}

pub async fn handle_withdraw(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    sender: Address,
    amount: U256,
) -> Result<(), TiergateError> {
    apply_movement(cx, ctx, sender, TrustAction::Withdraw, amount, None).await
}

/// Swap against the trust's pools: currency in, tokens out.
pub async fn handle_swap(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    sender: Address,
    currency_in: U256,
    tokens_out: U256,
) -> Result<(), TiergateError> {
    apply_movement(cx, ctx, sender, TrustAction::Swap, currency_in, Some(tokens_out)).await
}

async fn apply_movement(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    sender: Address,
    action: TrustAction,
    amount: U256,
    amount_out: Option<U256>,
) -> Result<(), TiergateError> {
    let record_id = log_scoped_id(ctx.tx_hash, ctx.contract, ctx.log_index);
    if cx.store.load(&record_id).await?.is_some() {
        return Ok(());
    }

    let trust_id = address_id(ctx.contract);
    let sender_id = address_id(sender);
    let mut trust = load_trust(cx, &trust_id).await?;
    let (mut participant, is_new) = load_participant(cx, &trust_id, &sender_id).await?;

    let amount = u256_to_decimal(amount);
    let amount_out = amount_out.map(u256_to_decimal);

    let record = TrustEvent {
        id: record_id.clone(),
        trust: trust_id,
        sender: sender_id,
        action,
        amount: amount.clone(),
        amount_out: amount_out.clone(),
        block: ctx.block_number as i64,
        timestamp: ctx.timestamp as i64,
    };

    match action {
        TrustAction::Deposit => {
            trust.currency_pool += &amount;
            participant.balance += &amount;
            trust.deposits.push(record_id.clone());
        }
        TrustAction::Withdraw => {
            trust.currency_pool -= &amount;
            participant.balance -= &amount;
            trust.withdrawals.push(record_id.clone());
        }
        TrustAction::Swap => {
            trust.currency_pool += &amount;
            if let Some(out) = &amount_out {
                trust.token_pool -= out;
            }
            trust.swaps.push(record_id.clone());
        }
    }

    if is_new {
        trust.participant_count += 1;
    }
    participant.events.push(record_id);

    cx.store
        .save_all(vec![
            Entity::TrustEvent(record),
            Entity::TrustParticipant(participant),
            Entity::Trust(trust),
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

    const TRUST: u8 = 0x7B;

    fn ctx(tx: u8, log_index: u64) -> EventCtx {
        EventCtx {
            contract: Address::with_last_byte(TRUST),
            tx_hash: B256::with_last_byte(tx),
            log_index,
            block_number: 10,
            timestamp: 1_700_000_010,
        }
    }

    #[tokio::test]
    async fn pools_and_balances_track_movements() {
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

        handle_deposit(&cx, &ctx(1, 0), alice, U256::from(100)).await.unwrap();
        handle_deposit(&cx, &ctx(2, 0), bob, U256::from(50)).await.unwrap();
        handle_withdraw(&cx, &ctx(3, 0), alice, U256::from(30)).await.unwrap();
        handle_swap(&cx, &ctx(4, 0), bob, U256::from(10), U256::from(7)).await.unwrap();

        let trust_id = address_id(Address::with_last_byte(TRUST));
        match store.load(&trust_id).await.unwrap().unwrap() {
            Entity::Trust(t) => {
                assert_eq!(t.currency_pool, BigDecimal::from(130));
                assert_eq!(t.token_pool, BigDecimal::from(-7));
                assert_eq!(t.participant_count, 2);
                assert_eq!(t.deposits.len(), 2);
                assert_eq!(t.withdrawals.len(), 1);
                assert_eq!(t.swaps.len(), 1);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }

        let alice_id = participant_id(&trust_id, &address_id(alice));
        match store.load(&alice_id).await.unwrap().unwrap() {
            Entity::TrustParticipant(p) => {
                assert_eq!(p.balance, BigDecimal::from(70));
                assert_eq!(p.events.len(), 2);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
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
        for _ in 0..3 {
            handle_deposit(&cx, &ctx(1, 2), alice, U256::from(100)).await.unwrap();
        }

        let trust_id = address_id(Address::with_last_byte(TRUST));
        match store.load(&trust_id).await.unwrap().unwrap() {
            Entity::Trust(t) => {
                assert_eq!(t.currency_pool, BigDecimal::from(100));
                assert_eq!(t.participant_count, 1);
                assert_eq!(t.deposits.len(), 1);
            }
            other => panic!("wrong kind: {}", other.kind()),
        }
    }
}
