//! Fixture deployment helpers.
//!
//! Every send waits for its receipt before returning, so a test can chain
//! dependent transactions without racing the node's mempool.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::providers::Provider;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use anyhow::{ensure, Context, Result};

/// Deploy a contract from raw creation bytecode and return its address.
pub async fn deploy_contract<P: Provider>(provider: &P, bytecode: Bytes) -> Result<Address> {
    let tx = TransactionRequest::default().with_deploy_code(bytecode);
    let receipt = provider
        .send_transaction(tx)
        .await?
        .get_receipt()
        .await
        .context("waiting for deployment receipt")?;

    ensure!(
        receipt.status(),
        "deployment reverted in tx {}",
        receipt.transaction_hash
    );
    receipt
        .contract_address
        .context("deployment receipt carries no contract address")
}

/// Send a transaction and wait until it is mined, failing on revert.
pub async fn send_confirmed<P: Provider>(
    provider: &P,
    tx: TransactionRequest,
) -> Result<TransactionReceipt> {
    let receipt = provider
        .send_transaction(tx)
        .await?
        .get_receipt()
        .await
        .context("waiting for transaction receipt")?;

    ensure!(
        receipt.status(),
        "transaction reverted: {}",
        receipt.transaction_hash
    );
    Ok(receipt)
}
