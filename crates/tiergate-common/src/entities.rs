use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Which contract variant a tier contract is. The variant is fixed by the
/// factory that deployed the contract and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierVariant {
    /// Tier derived from an ERC-20/721 balance threshold
    Balance,
    /// Tier granted on token transfer into the contract
    Transfer,
    /// Tier combined from a set of sub-tier contracts
    Combine,
    /// Tier gated behind an external verification contract
    Verify,
}

impl TierVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierVariant::Balance => "balance",
            TierVariant::Transfer => "transfer",
            TierVariant::Combine => "combine",
            TierVariant::Verify => "verify",
        }
    }
}

impl std::fmt::Display for TierVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle stage of a sale/auction contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Active,
    Success,
    Fail,
}

impl SaleStatus {
    /// Decode the uint8 status code emitted on-chain.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SaleStatus::Pending),
            1 => Some(SaleStatus::Active),
            2 => Some(SaleStatus::Success),
            3 => Some(SaleStatus::Fail),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Active => "active",
            SaleStatus::Success => "success",
            SaleStatus::Fail => "fail",
        }
    }
}

/// Token standard of a lazily discovered token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Erc20,
    Erc721,
}

/// Which escrow ledger movement an event record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowAction {
    Pending,
    Deposit,
    Undeposit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustAction {
    Deposit,
    Withdraw,
    Swap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeAction {
    Stake,
    Unstake,
}

/// Family of contract a tracked factory deploys. Drives which primary
/// record gets created for a new child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractFamily {
    Tier(TierVariant),
    Sale,
    Trust,
    Escrow,
    Stake,
}

/// A tracked deployer contract and the children it has created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factory {
    pub id: String,
    pub implementation: Option<String>,
    pub child_family: ContractFamily,
    pub children: Vec<String>,
    pub child_count: i64,
}

/// Primary record for a tier contract. `factory` and `variant` are None
/// when the contract was not deployed through a tracked factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierContract {
    pub id: String,
    pub variant: Option<TierVariant>,
    pub deployer: String,
    pub deploy_block: i64,
    pub deploy_timestamp: i64,
    pub factory: Option<String>,
    pub threshold: Option<BigDecimal>,
    pub token: Option<String>,
    pub verifier: Option<String>,
    pub combined: Vec<String>,
    pub tier_changes: Vec<String>,
    pub member_count: i64,
}

/// Immutable record of one tier transition, keyed `{txHash}-{contract}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierChange {
    pub id: String,
    pub contract: String,
    pub sender: String,
    pub account: String,
    pub start_tier: i32,
    pub end_tier: i32,
    pub block: i64,
    pub timestamp: i64,
}

/// Per-level membership counter, keyed `{contract}-{level}`, level 0..=8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierLevel {
    pub id: String,
    pub contract: String,
    pub level: i32,
    pub member_count: i64,
}

/// Per-account aggregate on a tier contract, keyed `{contract}-{account}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holder {
    pub id: String,
    pub contract: String,
    pub account: String,
    pub tier: i32,
    pub changes: Vec<String>,
}

/// ERC-20/721 wrapper record, created lazily at first reference and
/// enriched with on-chain metadata at that moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub token_kind: TokenKind,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<i32>,
    pub total_supply: Option<BigDecimal>,
    pub first_seen_block: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub deployer: String,
    pub deploy_block: i64,
    pub deploy_timestamp: i64,
    pub factory: Option<String>,
    pub token: Option<String>,
    pub cap: Option<BigDecimal>,
    pub status: SaleStatus,
    pub total_raised: BigDecimal,
    /// Exact integer-division percentage as decimal text, e.g. "42.50"
    pub percent_raised: String,
    pub purchases: Vec<String>,
    pub swaps: Vec<String>,
}

/// Immutable record of one Buy, keyed `{txHash}-{contract}-{logIndex}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub sale: String,
    pub buyer: String,
    pub amount: BigDecimal,
    pub tokens: BigDecimal,
    pub block: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSwap {
    pub id: String,
    pub sale: String,
    pub trader: String,
    pub amount_in: BigDecimal,
    pub amount_out: BigDecimal,
    pub block: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trust {
    pub id: String,
    pub deployer: String,
    pub deploy_block: i64,
    pub deploy_timestamp: i64,
    pub factory: Option<String>,
    pub currency_pool: BigDecimal,
    pub token_pool: BigDecimal,
    pub deposits: Vec<String>,
    pub withdrawals: Vec<String>,
    pub swaps: Vec<String>,
    pub participant_count: i64,
}

/// Immutable record of one trust movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEvent {
    pub id: String,
    pub trust: String,
    pub sender: String,
    pub action: TrustAction,
    pub amount: BigDecimal,
    /// Tokens paid out; only set for swaps
    pub amount_out: Option<BigDecimal>,
    pub block: i64,
    pub timestamp: i64,
}

/// Per-participant aggregate on a trust, keyed `{trust}-{account}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustParticipant {
    pub id: String,
    pub trust: String,
    pub account: String,
    pub balance: BigDecimal,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    pub id: String,
    pub deployer: String,
    pub deploy_block: i64,
    pub deploy_timestamp: i64,
    pub factory: Option<String>,
    pub sale: Option<String>,
    pub pending_deposits: Vec<String>,
    pub deposits: Vec<String>,
    pub undeposits: Vec<String>,
    pub withdrawals: Vec<String>,
}

/// Immutable record of one escrow ledger movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowDeposit {
    pub id: String,
    pub escrow: String,
    pub action: EscrowAction,
    pub depositor: String,
    pub sale: String,
    pub token: String,
    /// Redeemable token total supply at deposit time
    pub supply: BigDecimal,
    pub amount: BigDecimal,
    pub block: i64,
    pub timestamp: i64,
}

/// Escrow accounting bucket keyed `{escrow}-{supply}-{token}`, used to
/// compute pro-rata claims per supply snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowSupplyBucket {
    pub id: String,
    pub escrow: String,
    pub token: String,
    pub supply: BigDecimal,
    pub total_deposited: BigDecimal,
}

/// Per-depositor aggregate keyed `{sale}-{escrow}-{depositor}-{token}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowDepositor {
    pub id: String,
    pub escrow: String,
    pub sale: String,
    pub depositor: String,
    pub token: String,
    pub total_deposited: BigDecimal,
    pub deposits: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeVault {
    pub id: String,
    pub deployer: String,
    pub deploy_block: i64,
    pub deploy_timestamp: i64,
    pub factory: Option<String>,
    pub token: Option<String>,
    pub total_staked: BigDecimal,
    pub events: Vec<String>,
    pub holder_count: i64,
}

/// Immutable record of one stake/unstake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeEvent {
    pub id: String,
    pub vault: String,
    pub staker: String,
    pub action: StakeAction,
    pub amount: BigDecimal,
    pub block: i64,
    pub timestamp: i64,
}

/// Per-staker aggregate keyed `{vault}-{account}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeHolder {
    pub id: String,
    pub vault: String,
    pub account: String,
    pub balance: BigDecimal,
    pub events: Vec<String>,
}

/// Fallback record for an address that emitted a tracked event but was not
/// created through a tracked factory. Mutually exclusive with every typed
/// contract record for the same address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnknownContract {
    pub id: String,
    pub first_seen_block: i64,
}

/// The full entity universe, persisted as one JSONB payload per row with
/// the variant name as the `kind` discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Entity {
    Factory(Factory),
    TierContract(TierContract),
    TierChange(TierChange),
    TierLevel(TierLevel),
    Holder(Holder),
    Token(Token),
    Sale(Sale),
    Purchase(Purchase),
    SaleSwap(SaleSwap),
    Trust(Trust),
    TrustEvent(TrustEvent),
    TrustParticipant(TrustParticipant),
    Escrow(Escrow),
    EscrowDeposit(EscrowDeposit),
    EscrowSupplyBucket(EscrowSupplyBucket),
    EscrowDepositor(EscrowDepositor),
    StakeVault(StakeVault),
    StakeEvent(StakeEvent),
    StakeHolder(StakeHolder),
    UnknownContract(UnknownContract),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Factory(e) => &e.id,
            Entity::TierContract(e) => &e.id,
            Entity::TierChange(e) => &e.id,
            Entity::TierLevel(e) => &e.id,
            Entity::Holder(e) => &e.id,
            Entity::Token(e) => &e.id,
            Entity::Sale(e) => &e.id,
            Entity::Purchase(e) => &e.id,
            Entity::SaleSwap(e) => &e.id,
            Entity::Trust(e) => &e.id,
            Entity::TrustEvent(e) => &e.id,
            Entity::TrustParticipant(e) => &e.id,
            Entity::Escrow(e) => &e.id,
            Entity::EscrowDeposit(e) => &e.id,
            Entity::EscrowSupplyBucket(e) => &e.id,
            Entity::EscrowDepositor(e) => &e.id,
            Entity::StakeVault(e) => &e.id,
            Entity::StakeEvent(e) => &e.id,
            Entity::StakeHolder(e) => &e.id,
            Entity::UnknownContract(e) => &e.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Factory(_) => "Factory",
            Entity::TierContract(_) => "TierContract",
            Entity::TierChange(_) => "TierChange",
            Entity::TierLevel(_) => "TierLevel",
            Entity::Holder(_) => "Holder",
            Entity::Token(_) => "Token",
            Entity::Sale(_) => "Sale",
            Entity::Purchase(_) => "Purchase",
            Entity::SaleSwap(_) => "SaleSwap",
            Entity::Trust(_) => "Trust",
            Entity::TrustEvent(_) => "TrustEvent",
            Entity::TrustParticipant(_) => "TrustParticipant",
            Entity::Escrow(_) => "Escrow",
            Entity::EscrowDeposit(_) => "EscrowDeposit",
            Entity::EscrowSupplyBucket(_) => "EscrowSupplyBucket",
            Entity::EscrowDepositor(_) => "EscrowDepositor",
            Entity::StakeVault(_) => "StakeVault",
            Entity::StakeEvent(_) => "StakeEvent",
            Entity::StakeHolder(_) => "StakeHolder",
            Entity::UnknownContract(_) => "UnknownContract",
        }
    }

    /// Event records are write-once; everything else is upserted in place.
    pub fn is_event_record(&self) -> bool {
        matches!(
            self,
            Entity::TierChange(_)
                | Entity::Purchase(_)
                | Entity::SaleSwap(_)
                | Entity::TrustEvent(_)
                | Entity::EscrowDeposit(_)
                | Entity::StakeEvent(_)
        )
    }
}
