//! Snapshot Source Adapters
//!
//! Implements `SnapshotSource` over a subgraph GraphQL endpoint, plus a
//! fixed in-memory source.

use crate::domain::{Address, ChainId, HolderRecord};
use crate::ports::outbound::{SnapshotError, SnapshotSource};
use async_trait::async_trait;
use parking_lot::RwLock;
use primitive_types::U256;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

/// Holder query; `balance_gt: "0"` filters server-side.
pub const HOLDERS_QUERY: &str = r#"query Holders($project: String!, $first: Int!, $skip: Int!) {
  holders(
    where: { project: $project, balance_gt: "0" }
    first: $first
    skip: $skip
    orderBy: id
    orderDirection: asc
  ) {
    accountId
    balance
    originChainId
  }
}"#;

/// GraphQL POST seam. Production wires an HTTP client here.
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    /// Execute a query and return the full response body.
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, SnapshotError>;
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<HoldersData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct HoldersData {
    holders: Vec<RawHolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHolder {
    account_id: String,
    balance: String,
    origin_chain_id: String,
}

/// Parse a `0x`-prefixed 20-byte address.
pub fn parse_address(s: &str) -> Result<Address, SnapshotError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| SnapshotError::Malformed(format!("address without 0x prefix: {s}")))?;
    let bytes =
        hex::decode(digits).map_err(|e| SnapshotError::Malformed(format!("address {s}: {e}")))?;
    if bytes.len() != 20 {
        return Err(SnapshotError::Malformed(format!(
            "address {s}: expected 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

impl RawHolder {
    fn into_record(self) -> Result<HolderRecord, SnapshotError> {
        let account_address = parse_address(&self.account_id)?;
        let balance = U256::from_dec_str(&self.balance).map_err(|_| {
            SnapshotError::Malformed(format!("balance {:?} for {}", self.balance, self.account_id))
        })?;
        let origin_chain_id = self.origin_chain_id.parse::<u64>().map_err(|_| {
            SnapshotError::Malformed(format!(
                "originChainId {:?} for {}",
                self.origin_chain_id, self.account_id
            ))
        })?;
        Ok(HolderRecord::new(
            account_address,
            ChainId(origin_chain_id),
            balance,
        ))
    }
}

/// Subgraph-backed snapshot source.
pub struct SubgraphSnapshotSource<T: GraphQlTransport> {
    transport: T,
    page_size: usize,
}

impl<T: GraphQlTransport> SubgraphSnapshotSource<T> {
    /// Create a source requesting `page_size` holders per page.
    pub fn new(transport: T, page_size: usize) -> Self {
        Self {
            transport,
            page_size: page_size.max(1),
        }
    }

    async fn fetch_page(
        &self,
        project_id: &str,
        skip: usize,
    ) -> Result<Vec<RawHolder>, SnapshotError> {
        let variables = json!({
            "project": project_id,
            "first": self.page_size,
            "skip": skip,
        });
        let body = self.transport.execute(HOLDERS_QUERY, variables).await?;
        let response: GraphQlResponse =
            serde_json::from_value(body).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

        if !response.errors.is_empty() {
            let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(SnapshotError::Indexer(messages.join("; ")));
        }

        response
            .data
            .map(|d| d.holders)
            .ok_or_else(|| SnapshotError::Malformed("response has no data".to_string()))
    }
}

#[async_trait]
impl<T: GraphQlTransport> SnapshotSource for SubgraphSnapshotSource<T> {
    async fn fetch_holders(&self, project_id: &str) -> Result<Vec<HolderRecord>, SnapshotError> {
        // Subgraph entity ids are lowercase hex.
        let project = project_id.to_lowercase();
        let mut records = Vec::new();
        let mut skip = 0;

        loop {
            let page = self.fetch_page(&project, skip).await?;
            let page_len = page.len();
            debug!(project = %project, skip, page_len, "Fetched holder page");

            for raw in page {
                let record = raw.into_record()?;
                if !record.balance.is_zero() {
                    records.push(record);
                }
            }

            if page_len < self.page_size {
                break;
            }
            skip += page_len;
        }

        info!(project = %project, holders = records.len(), "Holder snapshot fetched");
        Ok(records)
    }
}

/// Fixed holder lists per project.
#[derive(Default)]
pub struct StaticSnapshotSource {
    projects: RwLock<HashMap<String, Vec<HolderRecord>>>,
}

impl StaticSnapshotSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the holders returned for a project.
    pub fn set_holders(&self, project_id: &str, holders: Vec<HolderRecord>) {
        self.projects
            .write()
            .insert(project_id.to_lowercase(), holders);
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch_holders(&self, project_id: &str) -> Result<Vec<HolderRecord>, SnapshotError> {
        Ok(self
            .projects
            .read()
            .get(&project_id.to_lowercase())
            .map(|holders| {
                holders
                    .iter()
                    .filter(|h| !h.balance.is_zero())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
