//! Poll the indexer status endpoint until it catches up with the chain.

use std::time::Duration;

use alloy::providers::Provider;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The status endpoint could not be reached or returned garbage.
    #[error("status endpoint unreachable: {0}")]
    Connect(String),
    /// The indexer recorded a fatal mapping error; waiting longer will not help.
    #[error("indexer reported fatal error: {0}")]
    IndexerFatal(String),
    /// The target block was not reached before the deadline.
    #[error("indexer did not reach block {target} within {timeout:?}")]
    Timeout { target: u64, timeout: Duration },
}

/// Subset of the status document the poller acts on.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerStatus {
    pub healthy: bool,
    pub fatal_error: Option<String>,
    pub last_indexed_block: i64,
}

pub struct SyncPoller {
    client: reqwest::Client,
    status_url: String,
    interval: Duration,
    timeout: Duration,
}

impl SyncPoller {
    pub fn new(status_url: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            status_url: status_url.into(),
            interval,
            timeout,
        }
    }

    async fn poll(&self) -> Result<IndexerStatus, SyncError> {
        let response = self
            .client
            .get(&self.status_url)
            .send()
            .await
            .map_err(|e| SyncError::Connect(e.to_string()))?;
        response
            .json::<IndexerStatus>()
            .await
            .map_err(|e| SyncError::Connect(e.to_string()))
    }

    /// Block until the indexer reports healthy with
    /// `last_indexed_block >= target`.
    ///
    /// A fatal error on an unhealthy run short-circuits immediately; a
    /// fatal marker left over from a run that has since recovered does not.
    /// Connect failures are retried at the poll interval (the API is
    /// usually still starting when an integration test begins polling) and
    /// only surface if the endpoint never comes up before the deadline.
    pub async fn wait_for_block(&self, target: u64) -> Result<IndexerStatus, SyncError> {
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            match self.poll().await {
                Ok(status) => {
                    if !status.healthy {
                        if let Some(message) = status.fatal_error {
                            return Err(SyncError::IndexerFatal(message));
                        }
                    }
                    if status.healthy && status.last_indexed_block >= target as i64 {
                        return Ok(status);
                    }
                    tracing::debug!(
                        target,
                        last_indexed_block = status.last_indexed_block,
                        "Indexer not caught up yet"
                    );
                }
                Err(connect @ SyncError::Connect(_)) => {
                    if tokio::time::Instant::now() + self.interval > deadline {
                        return Err(connect);
                    }
                    tracing::debug!("Status endpoint not reachable yet, retrying");
                }
                Err(other) => return Err(other),
            }

            if tokio::time::Instant::now() + self.interval > deadline {
                return Err(SyncError::Timeout {
                    target,
                    timeout: self.timeout,
                });
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Wait until the indexer has processed everything mined so far. The
    /// head is sampled once, up front, so transactions mined after this call
    /// starts do not move the goalposts.
    pub async fn wait_for_head<P: Provider>(
        &self,
        provider: &P,
    ) -> Result<IndexerStatus, SyncError> {
        let head = provider
            .get_block_number()
            .await
            .map_err(|e| SyncError::Connect(e.to_string()))?;
        self.wait_for_block(head).await
    }
}
