//! Per-network deployment configuration.
//!
//! The same JSON file drives the indexer (which addresses to track, where to
//! start) and the test harness (which factories to point deployments at).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::entities::ContractFamily;
use crate::error::TiergateError;

/// A tracked factory and the family of children it deploys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Lowercase hex address of the factory contract
    pub address: String,
    /// Implementation/template address the factory clones, if known
    #[serde(default)]
    pub implementation: Option<String>,
    pub child_family: ContractFamily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: String,
    pub start_block: u64,
    pub factories: Vec<FactoryConfig>,
}

impl NetworkConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TiergateError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TiergateError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, TiergateError> {
        let config: NetworkConfig =
            serde_json::from_str(raw).map_err(|e| TiergateError::Config(e.to_string()))?;
        for factory in &config.factories {
            if factory.address != factory.address.to_lowercase() {
                return Err(TiergateError::Config(format!(
                    "factory address must be lowercase hex: {}",
                    factory.address
                )));
            }
        }
        Ok(config)
    }

    /// Lookup table keyed by lowercase factory address.
    pub fn factory_index(&self) -> HashMap<String, &FactoryConfig> {
        self.factories
            .iter()
            .map(|f| (f.address.clone(), f))
            .collect()
    }
}
