use alloy::primitives::{Address, U256};
use bigdecimal::BigDecimal;

use tiergate_common::ids::{
    address_id, bucket_id, depositor_id, log_scoped_id, u256_to_decimal,
};
use tiergate_common::{
    Entity, Escrow, EscrowAction, EscrowDeposit, EscrowDepositor, EscrowSupplyBucket,
    TiergateError, TokenKind,
};

use crate::events::EventCtx;
use crate::handlers::{ensure_token, MappingContext, ZERO_ADDRESS};

fn placeholder_escrow(id: &str) -> Escrow {
    Escrow {
        id: id.to_string(),
        deployer: ZERO_ADDRESS.to_string(),
        deploy_block: 0,
        deploy_timestamp: 0,
        factory: None,
        sale: None,
        pending_deposits: Vec::new(),
        deposits: Vec::new(),
        undeposits: Vec::new(),
        withdrawals: Vec::new(),
    }
}

/// One escrow ledger movement. Deposits (pending included) add to the
/// supply-snapshot bucket and the depositor aggregate; undeposits and
/// withdrawals subtract from the same keys.
#[allow(clippy::too_many_arguments)]
pub async fn handle_movement(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    action: EscrowAction,
    depositor: Address,
    sale: Address,
    token: Address,
    supply: U256,
    amount: U256,
) -> Result<(), TiergateError> {
    let record_id = log_scoped_id(ctx.tx_hash, ctx.contract, ctx.log_index);
    if cx.store.load(&record_id).await?.is_some() {
        return Ok(());
    }

    let escrow_id = address_id(ctx.contract);
    let depositor_addr = address_id(depositor);
    let sale_id = address_id(sale);

    let mut escrow = match cx.store.load(&escrow_id).await? {
        Some(Entity::Escrow(e)) => e,
        _ => placeholder_escrow(&escrow_id),
    };
    if escrow.sale.is_none() {
        escrow.sale = Some(sale_id.clone());
    }

    let mut batch = Vec::new();

    let (token_id, token_entity) = ensure_token(cx, token, TokenKind::Erc20, ctx.block_number).await?;
    batch.extend(token_entity);

    let amount = u256_to_decimal(amount);
    let record = EscrowDeposit {
        id: record_id.clone(),
        escrow: escrow_id.clone(),
        action,
        depositor: depositor_addr.clone(),
        sale: sale_id.clone(),
        token: token_id.clone(),
        supply: u256_to_decimal(supply),
        amount: amount.clone(),
        block: ctx.block_number as i64,
        timestamp: ctx.timestamp as i64,
    };

    let bucket_key = bucket_id(&escrow_id, supply, &token_id);
    let mut bucket = match cx.store.load(&bucket_key).await? {
        Some(Entity::EscrowSupplyBucket(b)) => b,
        _ => EscrowSupplyBucket {
            id: bucket_key,
            escrow: escrow_id.clone(),
            token: token_id.clone(),
            supply: u256_to_decimal(supply),
            total_deposited: BigDecimal::from(0),
        },
    };

    let agg_key = depositor_id(&sale_id, &escrow_id, &depositor_addr, &token_id);
    let mut aggregate = match cx.store.load(&agg_key).await? {
        Some(Entity::EscrowDepositor(d)) => d,
        _ => EscrowDepositor {
            id: agg_key,
            escrow: escrow_id,
            sale: sale_id,
            depositor: depositor_addr,
            token: token_id,
            total_deposited: BigDecimal::from(0),
            deposits: Vec::new(),
        },
    };

    match action {
        EscrowAction::Pending | EscrowAction::Deposit => {
            bucket.total_deposited += &amount;
            aggregate.total_deposited += &amount;
        }
        EscrowAction::Undeposit | EscrowAction::Withdraw => {
            bucket.total_deposited -= &amount;
            aggregate.total_deposited -= &amount;
        }
    }

    match action {
        EscrowAction::Pending => escrow.pending_deposits.push(record_id.clone()),
        EscrowAction::Deposit => escrow.deposits.push(record_id.clone()),
        EscrowAction::Undeposit => escrow.undeposits.push(record_id.clone()),
        EscrowAction::Withdraw => escrow.withdrawals.push(record_id.clone()),
    }
    aggregate.deposits.push(record_id);

    batch.push(Entity::EscrowDeposit(record));
    batch.push(Entity::EscrowSupplyBucket(bucket));
    batch.push(Entity::EscrowDepositor(aggregate));
    batch.push(Entity::Escrow(escrow));
    cx.store.save_all(batch).await
}
