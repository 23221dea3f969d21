use alloy::primitives::Address;
use bigdecimal::BigDecimal;

use tiergate_common::ids::address_id;
use tiergate_common::{
    ContractFamily, Entity, Escrow, Factory, Sale, SaleStatus, StakeVault, TierContract,
    TiergateError, Trust,
};

use crate::events::EventCtx;
use crate::handlers::MappingContext;

/// A tracked factory deployed a child. Records Factory -> child provenance
/// and creates the child's primary record so later events on that address
/// resolve as "known".
pub async fn handle_child_created(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    child: Address,
    implementation: Address,
    deployer: Address,
) -> Result<(), TiergateError> {
    let factory_id = address_id(ctx.contract);
    let Some(config) = cx.factories.get(&factory_id) else {
        tracing::debug!(factory = %factory_id, "ChildCreated from untracked factory, skipping");
        return Ok(());
    };

    let child_id = address_id(child);
    let deployer_id = address_id(deployer);

    let mut factory = match cx.store.load(&factory_id).await? {
        Some(Entity::Factory(f)) => f,
        _ => Factory {
            id: factory_id.clone(),
            implementation: config
                .implementation
                .clone()
                .or_else(|| Some(address_id(implementation))),
            child_family: config.child_family,
            children: Vec::new(),
            child_count: 0,
        },
    };

    // ChildCreated has no event record of its own, so replay safety comes
    // from the membership check
    if !factory.children.contains(&child_id) {
        factory.children.push(child_id.clone());
        factory.child_count = factory.children.len() as i64;
    }

    let mut batch = Vec::new();

    // Never clobber an existing child record on replay
    if cx.store.load(&child_id).await?.is_none() {
        batch.push(new_child(
            config.child_family,
            &child_id,
            &deployer_id,
            Some(factory_id.clone()),
            ctx,
        ));
    }

    batch.push(Entity::Factory(factory));
    cx.store.save_all(batch).await
}

fn new_child(
    family: ContractFamily,
    id: &str,
    deployer: &str,
    factory: Option<String>,
    ctx: &EventCtx,
) -> Entity {
    let id = id.to_string();
    let deployer = deployer.to_string();
    let deploy_block = ctx.block_number as i64;
    let deploy_timestamp = ctx.timestamp as i64;

    match family {
        ContractFamily::Tier(variant) => Entity::TierContract(TierContract {
            id,
            variant: Some(variant),
            deployer,
            deploy_block,
            deploy_timestamp,
            factory,
            threshold: None,
            token: None,
            verifier: None,
            combined: Vec::new(),
            tier_changes: Vec::new(),
            member_count: 0,
        }),
        ContractFamily::Sale => Entity::Sale(Sale {
            id,
            deployer,
            deploy_block,
            deploy_timestamp,
            factory,
            token: None,
            cap: None,
            status: SaleStatus::Pending,
            total_raised: BigDecimal::from(0),
            percent_raised: "0.00".to_string(),
            purchases: Vec::new(),
            swaps: Vec::new(),
        }),
        ContractFamily::Trust => Entity::Trust(Trust {
            id,
            deployer,
            deploy_block,
            deploy_timestamp,
            factory,
            currency_pool: BigDecimal::from(0),
            token_pool: BigDecimal::from(0),
            deposits: Vec::new(),
            withdrawals: Vec::new(),
            swaps: Vec::new(),
            participant_count: 0,
        }),
        ContractFamily::Escrow => Entity::Escrow(Escrow {
            id,
            deployer,
            deploy_block,
            deploy_timestamp,
            factory,
            sale: None,
            pending_deposits: Vec::new(),
            deposits: Vec::new(),
            undeposits: Vec::new(),
            withdrawals: Vec::new(),
        }),
        ContractFamily::Stake => Entity::StakeVault(StakeVault {
            id,
            deployer,
            deploy_block,
            deploy_timestamp,
            factory,
            token: None,
            total_staked: BigDecimal::from(0),
            events: Vec::new(),
            holder_count: 0,
        }),
    }
}
