use anyhow::Result;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiergate_common::network::NetworkConfig;

mod config;
mod indexer;
mod state;

/// Retry delays for exponential backoff (in seconds)
const RETRY_DELAYS: &[u64] = &[5, 10, 20, 30, 60];
const MAX_RETRY_DELAY: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiergate_indexer=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tiergate Indexer");

    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;
    let network = NetworkConfig::from_file(&config.network_config)?;

    metrics_exporter_prometheus::PrometheusBuilder::new().install()?;

    let pool =
        tiergate_common::db::create_pool(&config.database_url, config.db_max_connections).await?;

    tracing::info!("Running database migrations");
    tiergate_common::db::run_migrations(&pool).await?;

    let indexer = indexer::Indexer::new(pool.clone(), config, network);

    // Outer retry for transient RPC/DB failures. A malformed event is not
    // transient: record it and stop so no block is half-applied.
    let mut retry_count = 0;
    loop {
        match indexer.run().await {
            Ok(()) => {
                retry_count = 0;
            }
            Err(e) if e.is_fatal() => {
                state::mark_fatal(&pool, &e.to_string()).await?;
                tracing::error!("Fatal mapping error, stopping: {e}");
                return Err(e.into());
            }
            Err(e) => {
                let delay = RETRY_DELAYS
                    .get(retry_count)
                    .copied()
                    .unwrap_or(MAX_RETRY_DELAY);

                tracing::error!(
                    "Indexing error: {}. Restarting in {}s (attempt {})...",
                    e,
                    delay,
                    retry_count + 1
                );

                tokio::time::sleep(Duration::from_secs(delay)).await;
                retry_count += 1;
            }
        }
    }
}
