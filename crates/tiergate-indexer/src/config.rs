use anyhow::{Context, Result};
use std::env;

use tiergate_mappings::metadata::MetadataPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub rpc_url: String,
    pub network_config: String,
    pub poll_interval_ms: u64,
    pub batch_size: u64,
    pub reindex: bool,
    pub metadata_policy: MetadataPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("Invalid DB_MAX_CONNECTIONS")?,
            rpc_url: env::var("RPC_URL")
                .context("RPC_URL must be set")?,
            network_config: env::var("NETWORK_CONFIG")
                .context("NETWORK_CONFIG must be set")?,
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Invalid POLL_INTERVAL_MS")?,
            batch_size: env::var("BATCH_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Invalid BATCH_SIZE")?,
            reindex: env::var("REINDEX")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid REINDEX")?,
            metadata_policy: match env::var("METADATA_POLICY")
                .unwrap_or_else(|_| "fetch-once".to_string())
                .as_str()
            {
                "fetch-once" => MetadataPolicy::FetchOnce,
                "always-refresh" => MetadataPolicy::AlwaysRefresh,
                other => anyhow::bail!("Invalid METADATA_POLICY: {other}"),
            },
        })
    }
}
