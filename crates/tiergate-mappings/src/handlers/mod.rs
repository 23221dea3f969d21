//! Per-event handlers.
//!
//! Every handler follows the same contract: load or defensively create the
//! primary entity for the emitting address, write the immutable event record
//! under its composite id (returning early when it already exists), append
//! the record id to each containing list, recompute derived fields, and
//! persist the whole batch with one `save_all`.

mod escrow;
mod factory;
mod sale;
mod stake;
mod tier;
mod token;
mod trust;

use std::collections::HashMap;

use tiergate_common::network::{FactoryConfig, NetworkConfig};
use tiergate_common::TiergateError;

use crate::events::{ChainEvent, EventCtx};
use crate::metadata::{MetadataPolicy, TokenMetadataSource};
use crate::resolve::{resolve_contract, KnownContract, Resolved};
use crate::store::EntityStore;

pub(crate) const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Everything a handler invocation needs: the store, the metadata source
/// with its staleness policy, and the tracked-factory table. All explicit
/// parameter state, no process-wide configuration.
pub struct MappingContext<'a> {
    pub store: &'a dyn EntityStore,
    pub metadata: &'a dyn TokenMetadataSource,
    pub policy: MetadataPolicy,
    pub factories: HashMap<String, FactoryConfig>,
}

impl<'a> MappingContext<'a> {
    pub fn new(
        store: &'a dyn EntityStore,
        metadata: &'a dyn TokenMetadataSource,
        policy: MetadataPolicy,
        network: &NetworkConfig,
    ) -> Self {
        Self {
            store,
            metadata,
            policy,
            factories: network
                .factories
                .iter()
                .map(|f| (f.address.clone(), f.clone()))
                .collect(),
        }
    }
}

/// Route one decoded event to its handler. Invoked strictly in per-block,
/// log-order sequence by the indexing loop.
pub async fn apply_event(
    cx: &MappingContext<'_>,
    ctx: &EventCtx,
    event: &ChainEvent,
) -> Result<(), TiergateError> {
    match event {
        ChainEvent::ChildCreated {
            child,
            implementation,
            deployer,
        } => factory::handle_child_created(cx, ctx, *child, *implementation, *deployer).await,

        // Tier, sale and stake contracts share the Initialized signature.
        // Sales carry their cap in the threshold slot; stake vaults only
        // link the staked token. Unknown emitters default to tier semantics
        ChainEvent::Initialized {
            token,
            verifier,
            threshold,
        } => match resolve_contract(cx.store, ctx.contract).await? {
            Resolved::Known(KnownContract::Sale(_)) => {
                sale::handle_initialized(cx, ctx, *token, *threshold).await
            }
            Resolved::Known(KnownContract::Stake(_)) => {
                stake::handle_initialized(cx, ctx, *token).await
            }
            _ => tier::handle_initialized(cx, ctx, *token, *verifier, *threshold).await,
        },

        ChainEvent::SubTierAdded { tier_contract } => {
            tier::handle_sub_tier_added(cx, ctx, *tier_contract).await
        }

        ChainEvent::TierChange {
            sender,
            account,
            start_tier,
            end_tier,
        } => tier::handle_tier_change(cx, ctx, *sender, *account, *start_tier, *end_tier).await,

        ChainEvent::Buy {
            buyer,
            amount,
            tokens,
        } => sale::handle_buy(cx, ctx, *buyer, *amount, *tokens).await,

        ChainEvent::StatusChanged { status } => sale::handle_status_changed(cx, ctx, *status).await,

        // Sale and trust contracts share the Swap signature; classify the
        // emitting address, defaulting unknown emitters to trust semantics
        ChainEvent::Swap {
            sender,
            amount_in,
            amount_out,
        } => match resolve_contract(cx.store, ctx.contract).await? {
            Resolved::Known(KnownContract::Sale(_)) => {
                sale::handle_swap(cx, ctx, *sender, *amount_in, *amount_out).await
            }
            _ => trust::handle_swap(cx, ctx, *sender, *amount_in, *amount_out).await,
        },

        ChainEvent::Deposit { sender, amount } => {
            trust::handle_deposit(cx, ctx, *sender, *amount).await
        }

        ChainEvent::Withdraw { sender, amount } => {
            trust::handle_withdraw(cx, ctx, *sender, *amount).await
        }

        ChainEvent::EscrowMovement {
            action,
            depositor,
            sale,
            token,
            supply,
            amount,
        } => {
            escrow::handle_movement(cx, ctx, *action, *depositor, *sale, *token, *supply, *amount)
                .await
        }

        ChainEvent::Staked { staker, amount } => {
            stake::handle_stake(cx, ctx, *staker, *amount, true).await
        }

        ChainEvent::Unstaked { staker, amount } => {
            stake::handle_stake(cx, ctx, *staker, *amount, false).await
        }
    }
}

pub use token::ensure_token;
