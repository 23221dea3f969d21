//! Composite-id derivation and chain-value normalization.
//!
//! Ids must be stable and reproducible so that replaying a block (reorg
//! recovery, restart) upserts the same rows instead of duplicating them.
//! Addresses are normalized to lowercase hex everywhere; amounts stay
//! arbitrary-precision end to end.

use alloy::primitives::{Address, B256, U256};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};

/// Canonical lowercase hex form of an address, used as-is as an entity id.
pub fn address_id(address: Address) -> String {
    format!("{address:#x}")
}

/// Id for a once-per-transaction event record: `{txHash}-{contract}`.
pub fn tx_scoped_id(tx_hash: B256, contract: Address) -> String {
    format!("{tx_hash:#x}-{contract:#x}")
}

/// Id for an event record that can repeat within one transaction:
/// `{txHash}-{contract}-{logIndex}`.
pub fn log_scoped_id(tx_hash: B256, contract: Address, log_index: u64) -> String {
    format!("{tx_hash:#x}-{contract:#x}-{log_index}")
}

/// Tier level id: `{contract}-{level}`.
pub fn level_id(contract: &str, level: i32) -> String {
    format!("{contract}-{level}")
}

/// Per-user aggregate id: `{contract}-{account}`.
pub fn participant_id(contract: &str, account: &str) -> String {
    format!("{contract}-{account}")
}

/// Escrow supply-snapshot bucket id: `{escrow}-{supply}-{token}`.
pub fn bucket_id(escrow: &str, supply: U256, token: &str) -> String {
    format!("{escrow}-{supply}-{token}")
}

/// Escrow depositor aggregate id: `{sale}-{escrow}-{depositor}-{token}`.
pub fn depositor_id(sale: &str, escrow: &str, depositor: &str, token: &str) -> String {
    format!("{sale}-{escrow}-{depositor}-{token}")
}

/// Lossless U256 -> BigDecimal. Goes through the big-endian bytes so no
/// string parse (and no parse error) is involved.
pub fn u256_to_decimal(value: U256) -> BigDecimal {
    let int = BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>());
    BigDecimal::from(int)
}

/// Percentage of `raised` against `cap` as decimal text with two fractional
/// digits, computed with exact integer division. Chain quantities never go
/// through floating point.
pub fn percent_string(raised: &BigDecimal, cap: &BigDecimal) -> String {
    let raised = raised.with_scale(0).as_bigint_and_exponent().0;
    let cap = cap.with_scale(0).as_bigint_and_exponent().0;
    if cap == BigInt::from(0) {
        return "0.00".to_string();
    }
    // Scale to hundredths of a percent before dividing
    let scaled = (raised * 10_000) / cap;
    let whole = &scaled / 100;
    let frac = &scaled % 100;
    format!("{whole}.{:02}", frac)
}
