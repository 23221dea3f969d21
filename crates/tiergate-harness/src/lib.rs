//! Integration-test harness: wait for the indexer to catch up with the
//! chain, deploy fixture contracts, and query the indexed entities.

pub mod deploy;
pub mod queries;
pub mod sync;

pub use queries::QueryClient;
pub use sync::{SyncError, SyncPoller};

// The same per-network contract table the indexer consumes
pub use tiergate_common::network::{FactoryConfig, NetworkConfig};
