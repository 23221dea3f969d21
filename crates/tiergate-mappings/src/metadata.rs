//! On-chain token metadata lookups.
//!
//! A token record is enriched exactly once, at first reference (the source
//! system never refreshes). `MetadataPolicy` keeps that behavior the default
//! while allowing refresh-on-reference deployments. Non-conforming contracts
//! simply yield nulled fields; a metadata failure never aborts a handler.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use tiergate_common::TokenKind;

/// Whether token metadata is fetched once at first sight or re-read on
/// every reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataPolicy {
    #[default]
    FetchOnce,
    AlwaysRefresh,
}

/// Static metadata read from a token contract. Every field is optional:
/// contracts are free to implement none of the accessors.
#[derive(Debug, Clone, Default)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
}

#[async_trait]
pub trait TokenMetadataSource: Send + Sync {
    /// Read name/symbol/decimals/totalSupply from the contract. Infallible
    /// by design: any failing accessor leaves its field None.
    async fn fetch(&self, address: Address, kind: TokenKind) -> TokenMetadata;
}

// Function selectors
const NAME_SELECTOR: [u8; 4] = [0x06, 0xfd, 0xde, 0x03]; // name()
const SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41]; // symbol()
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67]; // decimals()
const TOTAL_SUPPLY_SELECTOR: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd]; // totalSupply()

/// Reads metadata through `eth_call` at selector level, so non-standard
/// tokens degrade field by field instead of failing wholesale.
pub struct RpcMetadataSource<P> {
    provider: P,
}

impl<P: Provider> RpcMetadataSource<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    async fn call(&self, address: Address, selector: &[u8; 4]) -> Option<Vec<u8>> {
        let tx = TransactionRequest::default()
            .to(address)
            .input(alloy::primitives::Bytes::from(selector.to_vec()).into());
        let result = self.provider.call(tx).await.ok()?;
        Some(result.to_vec())
    }

    async fn call_string(&self, address: Address, selector: &[u8; 4]) -> Option<String> {
        let result = self.call(address, selector).await?;

        // ABI string layout: offset word, length word, then the bytes
        if result.len() < 64 {
            return None;
        }
        let offset: usize = U256::from_be_slice(&result[0..32]).try_into().ok()?;
        if offset + 32 > result.len() {
            return None;
        }
        let length: usize = U256::from_be_slice(&result[offset..offset + 32])
            .try_into()
            .ok()?;
        if offset + 32 + length > result.len() {
            return None;
        }
        String::from_utf8(result[offset + 32..offset + 32 + length].to_vec()).ok()
    }

    async fn call_uint8(&self, address: Address, selector: &[u8; 4]) -> Option<u8> {
        let result = self.call(address, selector).await?;
        if result.len() < 32 {
            return None;
        }
        // uint8 is right-aligned in the 32-byte word
        Some(result[31])
    }

    async fn call_uint256(&self, address: Address, selector: &[u8; 4]) -> Option<U256> {
        let result = self.call(address, selector).await?;
        if result.len() < 32 {
            return None;
        }
        Some(U256::from_be_slice(&result[..32]))
    }
}

#[async_trait]
impl<P: Provider> TokenMetadataSource for RpcMetadataSource<P> {
    async fn fetch(&self, address: Address, kind: TokenKind) -> TokenMetadata {
        let name = self.call_string(address, &NAME_SELECTOR).await;
        let symbol = self.call_string(address, &SYMBOL_SELECTOR).await;
        let decimals = match kind {
            TokenKind::Erc20 => self.call_uint8(address, &DECIMALS_SELECTOR).await,
            TokenKind::Erc721 => None,
        };
        let total_supply = self.call_uint256(address, &TOTAL_SUPPLY_SELECTOR).await;

        TokenMetadata {
            name,
            symbol,
            decimals,
            total_supply,
        }
    }
}

/// Table-driven metadata source for tests and offline runs. Unregistered
/// addresses behave like non-conforming contracts (all fields None).
#[derive(Default)]
pub struct FixedMetadataSource {
    tokens: Mutex<HashMap<Address, TokenMetadata>>,
}

impl FixedMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: Address, metadata: TokenMetadata) {
        self.tokens
            .lock()
            .expect("metadata table poisoned")
            .insert(address, metadata);
    }
}

#[async_trait]
impl TokenMetadataSource for FixedMetadataSource {
    async fn fetch(&self, address: Address, _kind: TokenKind) -> TokenMetadata {
        self.tokens
            .lock()
            .expect("metadata table poisoned")
            .get(&address)
            .cloned()
            .unwrap_or_default()
    }
}
