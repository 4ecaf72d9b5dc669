//! Node capability detection
//!
//! Queries chain id, head block and sync status of the provider endpoint.

use serde::{Deserialize, Serialize};

use crate::{queries, RpcClient};

/// Capability tier based on endpoint health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CapabilityTier {
    /// Online and synced (within 10 blocks of the reported head)
    Full,
    /// Online but still catching up - reads may be stale
    Syncing,
    /// Not reachable
    Offline,
}

impl CapabilityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Syncing => "Syncing",
            Self::Offline => "Offline",
        }
    }
}

/// Node capabilities detected through probing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCapabilities {
    /// Node is reachable and responding
    pub is_online: bool,

    /// Chain id reported by `eth_chainId`
    pub chain_id: Option<u64>,

    /// Whether the reported chain id equals the configured network's
    pub chain_id_matches: Option<bool>,

    /// Current head block
    pub block_number: u64,

    /// Highest block known to a syncing node
    pub highest_block: Option<u64>,

    pub capability_tier: CapabilityTier,
}

impl NodeCapabilities {
    fn offline() -> Self {
        Self {
            is_online: false,
            chain_id: None,
            chain_id_matches: None,
            block_number: 0,
            highest_block: None,
            capability_tier: CapabilityTier::Offline,
        }
    }

    /// Blocks behind the highest known block
    pub fn sync_lag(&self) -> Option<u64> {
        self.highest_block
            .map(|h| h.saturating_sub(self.block_number))
    }

    pub fn is_synced(&self) -> bool {
        self.is_online && self.sync_lag().map_or(true, |lag| lag <= MAX_SYNC_LAG)
    }
}

/// Maximum lag (in blocks) before considering the node as syncing
const MAX_SYNC_LAG: u64 = 10;

/// Detect node capabilities by probing endpoints
pub async fn detect_capabilities(
    client: &RpcClient,
    expected_chain_id: Option<u64>,
) -> NodeCapabilities {
    let block_number = match client.block_number().await {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(url = %client.url(), error = %e, "Node capability query failed");
            return NodeCapabilities::offline();
        }
    };

    let chain_id = client.chain_id().await.ok();
    let chain_id_matches = match (chain_id, expected_chain_id) {
        (Some(actual), Some(expected)) => Some(actual == expected),
        _ => None,
    };
    if chain_id_matches == Some(false) {
        tracing::warn!(
            url = %client.url(),
            actual = ?chain_id,
            expected = ?expected_chain_id,
            "Node is on a different chain than configured"
        );
    }

    let highest_block = client
        .sync_status()
        .await
        .ok()
        .as_ref()
        .and_then(queries::highest_block);

    let mut caps = NodeCapabilities {
        is_online: true,
        chain_id,
        chain_id_matches,
        block_number,
        highest_block,
        capability_tier: CapabilityTier::Full,
    };
    if !caps.is_synced() {
        caps.capability_tier = CapabilityTier::Syncing;
    }
    caps
}
