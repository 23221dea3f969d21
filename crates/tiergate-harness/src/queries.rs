//! GraphQL queries used by the integration suites to assert on indexed
//! entities, plus a thin JSON client.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

pub const TIER_CONTRACT_QUERY: &str = r#"
query ($id: ID!) {
  tierContract(id: $id) {
    id
    deployer
    factory
    threshold
    token
    verifier
    memberCount
  }
}
"#;

pub const TIER_LEVELS_QUERY: &str = r#"
query ($contract: String!) {
  tierLevels(where: { contract: $contract }, orderBy: level) {
    id
    level
    memberCount
  }
}
"#;

pub const HOLDER_QUERY: &str = r#"
query ($id: ID!) {
  holder(id: $id) {
    id
    tier
    changes
  }
}
"#;

pub const SALE_QUERY: &str = r#"
query ($id: ID!) {
  sale(id: $id) {
    id
    status
    totalRaised
    percentRaised
    purchases
  }
}
"#;

pub const ESCROW_DEPOSITOR_QUERY: &str = r#"
query ($id: ID!) {
  escrowDepositor(id: $id) {
    id
    totalDeposited
    deposits
  }
}
"#;

pub struct QueryClient {
    client: reqwest::Client,
    endpoint: String,
}

impl QueryClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// POST a query and return the `data` payload; GraphQL-level errors are
    /// surfaced as failures rather than silently empty data.
    pub async fn query(&self, query: &str, variables: Value) -> Result<Value> {
        let response: Value = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .context("sending GraphQL query")?
            .json()
            .await
            .context("decoding GraphQL response")?;

        if let Some(errors) = response.get("errors") {
            bail!("GraphQL errors: {errors}");
        }
        response
            .get("data")
            .cloned()
            .context("GraphQL response carries no data")
    }
}
