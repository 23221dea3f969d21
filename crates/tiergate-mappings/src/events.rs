//! Fixed contract ABI: event signatures and log decoding.
//!
//! The schemas below are owned by the external contracts and must not
//! change. `decode_log` returns `Ok(None)` for logs whose topic0 is not
//! tracked; a tracked topic0 with an undecodable payload is a malformed
//! event and fatal to the block.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

use tiergate_common::{EscrowAction, TiergateError};

sol! {
    /// Emitted by every tracked factory when it clones a child contract.
    #[derive(Debug)]
    event ChildCreated(address indexed child, address implementation, address indexed deployer);

    /// Tier contract configuration, emitted once after deployment.
    #[derive(Debug)]
    event Initialized(address indexed token, address indexed verifier, uint256 threshold);

    /// Combine-variant tier contracts announce their sub-tiers one by one.
    #[derive(Debug)]
    event SubTierAdded(address indexed tierContract);

    #[derive(Debug)]
    event TierChange(address indexed sender, address indexed account, uint256 startTier, uint256 endTier);

    #[derive(Debug)]
    event Buy(address indexed buyer, uint256 amount, uint256 tokens);

    #[derive(Debug)]
    event StatusChanged(uint8 status);

    /// Shared by sale and trust contracts; the handler picks semantics by
    /// resolving the emitting address.
    #[derive(Debug)]
    event Swap(address indexed sender, uint256 amountIn, uint256 amountOut);

    #[derive(Debug)]
    event Deposit(address indexed sender, uint256 amount);

    #[derive(Debug)]
    event Withdraw(address indexed sender, uint256 amount);

    #[derive(Debug)]
    event PendingDeposit(address indexed depositor, address indexed sale, address indexed token, uint256 supply, uint256 amount);

    #[derive(Debug)]
    event EscrowDeposited(address indexed depositor, address indexed sale, address indexed token, uint256 supply, uint256 amount);

    #[derive(Debug)]
    event Undeposit(address indexed depositor, address indexed sale, address indexed token, uint256 supply, uint256 amount);

    #[derive(Debug)]
    event EscrowWithdrawn(address indexed depositor, address indexed sale, address indexed token, uint256 supply, uint256 amount);

    #[derive(Debug)]
    event Staked(address indexed staker, uint256 amount);

    #[derive(Debug)]
    event Unstaked(address indexed staker, uint256 amount);
}

/// Log identity shared by every handler invocation.
#[derive(Debug, Clone, Copy)]
pub struct EventCtx {
    pub contract: Address,
    pub tx_hash: B256,
    pub log_index: u64,
    pub block_number: u64,
    pub timestamp: u64,
}

/// One variant per tracked event signature, decoded once at the boundary.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    ChildCreated {
        child: Address,
        implementation: Address,
        deployer: Address,
    },
    Initialized {
        token: Address,
        verifier: Address,
        threshold: U256,
    },
    SubTierAdded {
        tier_contract: Address,
    },
    TierChange {
        sender: Address,
        account: Address,
        start_tier: U256,
        end_tier: U256,
    },
    Buy {
        buyer: Address,
        amount: U256,
        tokens: U256,
    },
    StatusChanged {
        status: u8,
    },
    Swap {
        sender: Address,
        amount_in: U256,
        amount_out: U256,
    },
    Deposit {
        sender: Address,
        amount: U256,
    },
    Withdraw {
        sender: Address,
        amount: U256,
    },
    EscrowMovement {
        action: EscrowAction,
        depositor: Address,
        sale: Address,
        token: Address,
        supply: U256,
        amount: U256,
    },
    Staked {
        staker: Address,
        amount: U256,
    },
    Unstaked {
        staker: Address,
        amount: U256,
    },
}

fn malformed(name: &str, err: impl std::fmt::Display) -> TiergateError {
    TiergateError::MalformedEvent(format!("{name}: {err}"))
}

/// Decode a log into its typed event, if its topic0 is tracked.
///
/// Block number and timestamp come from the enclosing block rather than the
/// log because the runtime already holds them and receipts omit timestamps.
pub fn decode_log(
    log: &Log,
    block_number: u64,
    timestamp: u64,
) -> Result<Option<(EventCtx, ChainEvent)>, TiergateError> {
    let Some(&topic0) = log.topics().first() else {
        return Ok(None);
    };

    // A mined log always carries both; their absence would collapse the
    // composite record ids that replay protection keys on.
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| TiergateError::MalformedEvent("log without transaction hash".into()))?;
    let log_index = log
        .log_index
        .ok_or_else(|| TiergateError::MalformedEvent("log without log index".into()))?;

    let ctx = EventCtx {
        contract: log.inner.address,
        tx_hash,
        log_index,
        block_number,
        timestamp,
    };

    let event = match topic0 {
        t if t == ChildCreated::SIGNATURE_HASH => {
            let e = ChildCreated::decode_log(&log.inner).map_err(|e| malformed("ChildCreated", e))?.data;
            ChainEvent::ChildCreated {
                child: e.child,
                implementation: e.implementation,
                deployer: e.deployer,
            }
        }
        t if t == Initialized::SIGNATURE_HASH => {
            let e = Initialized::decode_log(&log.inner).map_err(|e| malformed("Initialized", e))?.data;
            ChainEvent::Initialized {
                token: e.token,
                verifier: e.verifier,
                threshold: e.threshold,
            }
        }
        t if t == SubTierAdded::SIGNATURE_HASH => {
            let e = SubTierAdded::decode_log(&log.inner).map_err(|e| malformed("SubTierAdded", e))?.data;
            ChainEvent::SubTierAdded {
                tier_contract: e.tierContract,
            }
        }
        t if t == TierChange::SIGNATURE_HASH => {
            let e = TierChange::decode_log(&log.inner).map_err(|e| malformed("TierChange", e))?.data;
            ChainEvent::TierChange {
                sender: e.sender,
                account: e.account,
                start_tier: e.startTier,
                end_tier: e.endTier,
            }
        }
        t if t == Buy::SIGNATURE_HASH => {
            let e = Buy::decode_log(&log.inner).map_err(|e| malformed("Buy", e))?.data;
            ChainEvent::Buy {
                buyer: e.buyer,
                amount: e.amount,
                tokens: e.tokens,
            }
        }
        t if t == StatusChanged::SIGNATURE_HASH => {
            let e = StatusChanged::decode_log(&log.inner).map_err(|e| malformed("StatusChanged", e))?.data;
            ChainEvent::StatusChanged { status: e.status }
        }
        t if t == Swap::SIGNATURE_HASH => {
            let e = Swap::decode_log(&log.inner).map_err(|e| malformed("Swap", e))?.data;
            ChainEvent::Swap {
                sender: e.sender,
                amount_in: e.amountIn,
                amount_out: e.amountOut,
            }
        }
        t if t == Deposit::SIGNATURE_HASH => {
            let e = Deposit::decode_log(&log.inner).map_err(|e| malformed("Deposit", e))?.data;
            ChainEvent::Deposit {
                sender: e.sender,
                amount: e.amount,
            }
        }
        t if t == Withdraw::SIGNATURE_HASH => {
            let e = Withdraw::decode_log(&log.inner).map_err(|e| malformed("Withdraw", e))?.data;
            ChainEvent::Withdraw {
                sender: e.sender,
                amount: e.amount,
            }
        }
        t if t == PendingDeposit::SIGNATURE_HASH => {
            let e = PendingDeposit::decode_log(&log.inner).map_err(|e| malformed("PendingDeposit", e))?.data;
            ChainEvent::EscrowMovement {
                action: EscrowAction::Pending,
                depositor: e.depositor,
                sale: e.sale,
                token: e.token,
                supply: e.supply,
                amount: e.amount,
            }
        }
        t if t == EscrowDeposited::SIGNATURE_HASH => {
            let e =
                EscrowDeposited::decode_log(&log.inner).map_err(|e| malformed("EscrowDeposited", e))?.data;
            ChainEvent::EscrowMovement {
                action: EscrowAction::Deposit,
                depositor: e.depositor,
                sale: e.sale,
                token: e.token,
                supply: e.supply,
                amount: e.amount,
            }
        }
        t if t == Undeposit::SIGNATURE_HASH => {
            let e = Undeposit::decode_log(&log.inner).map_err(|e| malformed("Undeposit", e))?.data;
            ChainEvent::EscrowMovement {
                action: EscrowAction::Undeposit,
                depositor: e.depositor,
                sale: e.sale,
                token: e.token,
                supply: e.supply,
                amount: e.amount,
            }
        }
        t if t == EscrowWithdrawn::SIGNATURE_HASH => {
            let e =
                EscrowWithdrawn::decode_log(&log.inner).map_err(|e| malformed("EscrowWithdrawn", e))?.data;
            ChainEvent::EscrowMovement {
                action: EscrowAction::Withdraw,
                depositor: e.depositor,
                sale: e.sale,
                token: e.token,
                supply: e.supply,
                amount: e.amount,
            }
        }
        t if t == Staked::SIGNATURE_HASH => {
            let e = Staked::decode_log(&log.inner).map_err(|e| malformed("Staked", e))?.data;
            ChainEvent::Staked {
                staker: e.staker,
                amount: e.amount,
            }
        }
        t if t == Unstaked::SIGNATURE_HASH => {
            let e = Unstaked::decode_log(&log.inner).map_err(|e| malformed("Unstaked", e))?.data;
            ChainEvent::Unstaked {
                staker: e.staker,
                amount: e.amount,
            }
        }
        _ => return Ok(None),
    };

    Ok(Some((ctx, event)))
}
