use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use metrics::counter;
use sqlx::PgPool;
use std::time::Duration;

use tiergate_common::network::NetworkConfig;
use tiergate_common::TiergateError;
use tiergate_mappings::events::decode_log;
use tiergate_mappings::metadata::RpcMetadataSource;
use tiergate_mappings::store::PgStore;
use tiergate_mappings::{apply_event, MappingContext};

use crate::config::Config;
use crate::state;

fn rpc_err(e: impl std::fmt::Display) -> TiergateError {
    TiergateError::Rpc(e.to_string())
}

pub struct Indexer {
    pool: PgPool,
    config: Config,
    network: NetworkConfig,
}

impl Indexer {
    pub fn new(pool: PgPool, config: Config, network: NetworkConfig) -> Self {
        Self {
            pool,
            config,
            network,
        }
    }

    /// Tail the chain: one block at a time, logs in log-index order, every
    /// decoded event dispatched before the next block is touched. Returns
    /// only on error; `MalformedEvent` must reach the caller untouched so
    /// the run can be marked fatal instead of retried.
    pub async fn run(&self) -> Result<(), TiergateError> {
        let provider = ProviderBuilder::new().connect_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| TiergateError::Config(format!("RPC_URL: {e}")))?,
        );

        if self.config.reindex {
            tracing::warn!("Reindex flag set - truncating entity and state tables");
            self.truncate_tables().await?;
        }

        let store = PgStore::new(self.pool.clone());
        let metadata = RpcMetadataSource::new(provider.clone());
        let cx = MappingContext::new(
            &store,
            &metadata,
            self.config.metadata_policy,
            &self.network,
        );

        let mut current = match state::last_indexed_block(&self.pool).await? {
            Some(n) => (n + 1).max(self.network.start_block),
            None => self.network.start_block,
        };
        state::mark_healthy(&self.pool).await?;
        tracing::info!(network = %self.network.network, "Starting indexing from block {current}");

        loop {
            let head = provider.get_block_number().await.map_err(rpc_err)?;
            if current > head {
                tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                continue;
            }

            let end = (current + self.config.batch_size - 1).min(head);
            tracing::debug!("Indexing blocks {current} to {end} (head {head})");

            while current <= end {
                self.process_block(&provider, &cx, current).await?;
                state::set_last_indexed_block(&self.pool, current).await?;
                current += 1;
            }
        }
    }

    async fn process_block<P: Provider>(
        &self,
        provider: &P,
        cx: &MappingContext<'_>,
        number: u64,
    ) -> Result<(), TiergateError> {
        let block = provider
            .get_block_by_number(number.into())
            .await
            .map_err(rpc_err)?
            .ok_or_else(|| TiergateError::Rpc(format!("block {number} not found")))?;
        let timestamp = block.header.timestamp;

        let filter = Filter::new().from_block(number).to_block(number);
        let mut logs = provider.get_logs(&filter).await.map_err(rpc_err)?;
        // get_logs order is not contractual across nodes
        logs.sort_by_key(|l| l.log_index.unwrap_or(u64::MAX));

        for log in &logs {
            if let Some((ctx, event)) = decode_log(log, number, timestamp)? {
                tracing::debug!(
                    contract = %ctx.contract,
                    tx = %ctx.tx_hash,
                    log_index = ctx.log_index,
                    "Applying event"
                );
                apply_event(cx, &ctx, &event).await?;
                counter!("tiergate_events_applied_total").increment(1);
            }
        }

        counter!("tiergate_blocks_indexed_total").increment(1);
        Ok(())
    }

    async fn truncate_tables(&self) -> Result<(), TiergateError> {
        sqlx::query("TRUNCATE entities").execute(&self.pool).await?;
        sqlx::query("TRUNCATE indexer_state")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
