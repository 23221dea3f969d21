use alloy::primitives::{Address, U256};
use bigdecimal::BigDecimal;

use tiergate_common::ids::{address_id, log_scoped_id, percent_string, u256_to_decimal};
use tiergate_common::{Entity, Purchase, Sale, SaleStatus, SaleSwap, TiergateError, TokenKind};

use crate::events::EventCtx;
use crate::handlers::{ensure_token, MappingContext, ZERO_ADDRESS};

fn placeholder_sale(id: &str) -> Sale {
    Sale {
        id: id.to_string(),
        deployer: ZERO_ADDRESS.to_string(),
        deploy_block: 0,
        deploy_timestamp: 0,
        factory: None,
        token: None,
        cap: None,
        status: SaleStatus::Pending,
        total_raised: BigDecimal::from(0),
        percent_raised: "0.00".to_string(),
        purchases: Vec::new(),
        swaps: Vec::new(),
    }
}

async fn load_sale(cx: &MappingContext<'_>, id: &str) -> Result<Sale, TiergateError> {
    match cx.store.load(id).await? {
        Some(Entity::Sale(s)) => Ok(s),
        _ => Ok(placeholder_sale(id)),
    }
}

/// Sale configuration: link the sold token and set the raise cap (carried
/// in the threshold slot of the shared Initialized signature). Recomputes
/// the percent in case purchases landed before configuration.
pub async fn handle_initialized(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    token: Address,
    cap: U256,
) -> Result<(), TiergateError> {
    let sale_id = address_id(ctx.contract);
    let mut sale = load_sale(cx, &sale_id).await?;

    let mut batch = Vec::new();
    if token != Address::ZERO {
        let (token_id, token_entity) =
            ensure_token(cx, token, TokenKind::Erc20, ctx.block_number).await?;
        sale.token = Some(token_id);
        batch.extend(token_entity);
    }
    if cap != U256::ZERO {
        sale.cap = Some(u256_to_decimal(cap));
    }
    sale.percent_raised = match &sale.cap {
        Some(cap) => percent_string(&sale.total_raised, cap),
        None => "0.00".to_string(),
    };

    batch.push(Entity::Sale(sale));
    cx.store.save_all(batch).await
}

/// A purchase against the sale: immutable record, running total and exact
/// percent-of-cap recomputation.
pub async fn handle_buy(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    buyer: Address,
    amount: U256,
    tokens: U256,
) -> Result<(), TiergateError> {
    let record_id = log_scoped_id(ctx.tx_hash, ctx.contract, ctx.log_index);
    if cx.store.load(&record_id).await?.is_some() {
        return Ok(());
    }

    let sale_id = address_id(ctx.contract);
    let mut sale = load_sale(cx, &sale_id).await?;

    let amount = u256_to_decimal(amount);
    let record = Purchase {
        id: record_id.clone(),
        sale: sale_id,
        buyer: address_id(buyer),
        amount: amount.clone(),
        tokens: u256_to_decimal(tokens),
        block: ctx.block_number as i64,
        timestamp: ctx.timestamp as i64,
    };

    sale.total_raised += amount;
    sale.percent_raised = match &sale.cap {
        Some(cap) => percent_string(&sale.total_raised, cap),
        None => "0.00".to_string(),
    };
    sale.purchases.push(record_id);

    cx.store
        .save_all(vec![Entity::Purchase(record), Entity::Sale(sale)])
        .await
}

/// Lifecycle transition emitted by the sale contract itself.
pub async fn handle_status_changed(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    status: u8,
) -> Result<(), TiergateError> {
    let status = SaleStatus::from_code(status)
        .ok_or_else(|| TiergateError::MalformedEvent(format!("unknown sale status {status}")))?;

    let sale_id = address_id(ctx.contract);
    let mut sale = load_sale(cx, &sale_id).await?;
    sale.status = status;
    cx.store.save_all(vec![Entity::Sale(sale)]).await
}

pub async fn handle_swap(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    trader: Address,
    amount_in: U256,
    amount_out: U256,
) -> Result<(), TiergateError> {
    let record_id = log_scoped_id(ctx.tx_hash, ctx.contract, ctx.log_index);
    if cx.store.load(&record_id).await?.is_some() {
        return Ok(());
    }

    let sale_id = address_id(ctx.contract);
    let mut sale = load_sale(cx, &sale_id).await?;

    let record = SaleSwap {
        id: record_id.clone(),
        sale: sale_id,
        trader: address_id(trader),
        amount_in: u256_to_decimal(amount_in),
        amount_out: u256_to_decimal(amount_out),
        block: ctx.block_number as i64,
        timestamp: ctx.timestamp as i64,
    };

    sale.swaps.push(record_id);
    cx.store
        .save_all(vec![Entity::SaleSwap(record), Entity::Sale(sale)])
        .await
}
