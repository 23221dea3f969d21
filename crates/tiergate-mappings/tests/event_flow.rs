//! End-to-end mapping flow: encoded logs in, indexed entities out.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;

use tiergate_common::ids::{address_id, level_id, participant_id};
use tiergate_common::network::{FactoryConfig, NetworkConfig};
use tiergate_common::{ContractFamily, Entity, TierVariant};
use tiergate_mappings::events::{self, decode_log};
use tiergate_mappings::metadata::{FixedMetadataSource, MetadataPolicy, TokenMetadata};
use tiergate_mappings::resolve::{resolve_contract, KnownContract, Resolved};
use tiergate_mappings::store::{EntityStore, MemoryStore};
use tiergate_mappings::{apply_event, MappingContext};

const FACTORY: u8 = 0xFA;
const TIER: u8 = 0xC0;
const TOKEN: u8 = 0x70;

fn rpc_log(address: Address, data: alloy::primitives::LogData, tx: u8, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log { address, data },
        block_hash: None,
        block_number: Some(100),
        block_timestamp: None,
        transaction_hash: Some(B256::with_last_byte(tx)),
        transaction_index: Some(0),
        log_index: Some(log_index),
        removed: false,
    }
}

fn network() -> NetworkConfig {
    NetworkConfig {
        network: "test".into(),
        start_block: 0,
        factories: vec![FactoryConfig {
            address: address_id(Address::with_last_byte(FACTORY)),
            implementation: None,
            child_family: ContractFamily::Tier(TierVariant::Balance),
        }],
    }
}

async fn run(cx: &MappingContext<'_>, logs: Vec<Log>) {
    for log in logs {
        if let Some((ctx, event)) = decode_log(&log, 100, 1_700_000_100).unwrap() {
            apply_event(cx, &ctx, &event).await.unwrap();
        }
    }
}

#[tokio::test]
async fn factory_initialize_tier_change_pipeline() {
    let store = MemoryStore::new();
    let metadata = FixedMetadataSource::new();
    metadata.insert(
        Address::with_last_byte(TOKEN),
        TokenMetadata {
            name: Some("Gate Token".into()),
            symbol: Some("GATE".into()),
            decimals: Some(18),
            total_supply: Some(U256::from(21_000_000u64)),
        },
    );
    let network = network();
    let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

    let tier = Address::with_last_byte(TIER);
    let user = Address::with_last_byte(0x01);

    let logs = vec![
        rpc_log(
            Address::with_last_byte(FACTORY),
            events::ChildCreated {
                child: tier,
                implementation: Address::with_last_byte(0x99),
                deployer: Address::with_last_byte(0xD1),
            }
            .encode_log_data(),
            1,
            0,
        ),
        rpc_log(
            tier,
            events::Initialized {
                token: Address::with_last_byte(TOKEN),
                verifier: Address::ZERO,
                threshold: U256::from(500),
            }
            .encode_log_data(),
            2,
            0,
        ),
        rpc_log(
            tier,
            events::TierChange {
                sender: user,
                account: user,
                startTier: U256::ZERO,
                endTier: U256::from(5),
            }
            .encode_log_data(),
            3,
            0,
        ),
    ];
    run(&cx, logs).await;

    // The tier contract resolves as known with factory provenance
    match resolve_contract(&store, tier).await.unwrap() {
        Resolved::Known(KnownContract::Tier(t)) => {
            assert_eq!(t.variant, Some(TierVariant::Balance));
            assert_eq!(t.factory, Some(address_id(Address::with_last_byte(FACTORY))));
            assert_eq!(t.token, Some(address_id(Address::with_last_byte(TOKEN))));
            assert_eq!(t.member_count, 1);
        }
        other => panic!("unexpected resolution: {other:?}"),
    }

    // The linked token carries first-sight metadata
    match store
        .load(&address_id(Address::with_last_byte(TOKEN)))
        .await
        .unwrap()
        .unwrap()
    {
        Entity::Token(t) => {
            assert_eq!(t.name.as_deref(), Some("Gate Token"));
            assert_eq!(t.total_supply.unwrap().to_string(), "21000000");
        }
        other => panic!("wrong kind: {}", other.kind()),
    }

    // Level 5 counts the one member, the holder tracks the tier
    let tier_id = address_id(tier);
    match store.load(&level_id(&tier_id, 5)).await.unwrap().unwrap() {
        Entity::TierLevel(l) => assert_eq!(l.member_count, 1),
        other => panic!("wrong kind: {}", other.kind()),
    }
    match store
        .load(&participant_id(&tier_id, &address_id(user)))
        .await
        .unwrap()
        .unwrap()
    {
        Entity::Holder(h) => assert_eq!(h.tier, 5),
        other => panic!("wrong kind: {}", other.kind()),
    }
}

#[tokio::test]
async fn sale_cap_drives_percent_raised() {
    let store = MemoryStore::new();
    let metadata = FixedMetadataSource::new();
    let network = NetworkConfig {
        network: "test".into(),
        start_block: 0,
        factories: vec![FactoryConfig {
            address: address_id(Address::with_last_byte(FACTORY)),
            implementation: None,
            child_family: ContractFamily::Sale,
        }],
    };
    let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

    let sale = Address::with_last_byte(0x5A);
    let buyer = Address::with_last_byte(0x01);

    let logs = vec![
        rpc_log(
            Address::with_last_byte(FACTORY),
            events::ChildCreated {
                child: sale,
                implementation: Address::ZERO,
                deployer: buyer,
            }
            .encode_log_data(),
            1,
            0,
        ),
        // Initialized on a known sale configures token and cap
        rpc_log(
            sale,
            events::Initialized {
                token: Address::with_last_byte(TOKEN),
                verifier: Address::ZERO,
                threshold: U256::from(300),
            }
            .encode_log_data(),
            2,
            0,
        ),
        rpc_log(
            sale,
            events::Buy {
                buyer,
                amount: U256::from(101),
                tokens: U256::from(10),
            }
            .encode_log_data(),
            3,
            0,
        ),
    ];
    run(&cx, logs).await;

    match store.load(&address_id(sale)).await.unwrap().unwrap() {
        Entity::Sale(s) => {
            assert_eq!(s.token, Some(address_id(Address::with_last_byte(TOKEN))));
            assert_eq!(s.cap.unwrap().to_string(), "300");
            assert_eq!(s.total_raised.to_string(), "101");
            assert_eq!(s.percent_raised, "33.66");
            assert_eq!(s.purchases.len(), 1);
        }
        other => panic!("wrong kind: {}", other.kind()),
    }
}

#[tokio::test]
async fn swap_routes_by_contract_classification() {
    let store = MemoryStore::new();
    let metadata = FixedMetadataSource::new();
    let network = NetworkConfig {
        network: "test".into(),
        start_block: 0,
        factories: vec![FactoryConfig {
            address: address_id(Address::with_last_byte(FACTORY)),
            implementation: None,
            child_family: ContractFamily::Sale,
        }],
    };
    let cx = MappingContext::new(&store, &metadata, MetadataPolicy::FetchOnce, &network);

    let sale = Address::with_last_byte(0x5A);
    let unknown = Address::with_last_byte(0xEE);
    let trader = Address::with_last_byte(0x01);

    let logs = vec![
        rpc_log(
            Address::with_last_byte(FACTORY),
            events::ChildCreated {
                child: sale,
                implementation: Address::ZERO,
                deployer: trader,
            }
            .encode_log_data(),
            1,
            0,
        ),
        rpc_log(
            sale,
            events::Swap {
                sender: trader,
                amountIn: U256::from(10),
                amountOut: U256::from(9),
            }
            .encode_log_data(),
            2,
            0,
        ),
        rpc_log(
            unknown,
            events::Swap {
                sender: trader,
                amountIn: U256::from(3),
                amountOut: U256::from(2),
            }
            .encode_log_data(),
            3,
            0,
        ),
    ];
    run(&cx, logs).await;

    // Known sale gets a SaleSwap record
    match store.load(&address_id(sale)).await.unwrap().unwrap() {
        Entity::Sale(s) => assert_eq!(s.swaps.len(), 1),
        other => panic!("wrong kind: {}", other.kind()),
    }

    // Unknown emitter falls back to trust semantics with a placeholder
    match store.load(&address_id(unknown)).await.unwrap().unwrap() {
        Entity::Trust(t) => {
            assert_eq!(t.factory, None);
            assert_eq!(t.swaps.len(), 1);
        }
        other => panic!("wrong kind: {}", other.kind()),
    }
}
