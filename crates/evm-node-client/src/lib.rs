//! evm-node-client: EVM node and wallet access over an alloy provider
//!
//! This crate wraps an alloy HTTP provider with the pieces the capsule flows
//! need on top: per-request timeouts, error classification into
//! [`NodeError`] and capability detection (chain id and sync status).

pub mod capabilities;
pub mod queries;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{SyncStatus, TransactionReceipt};
use alloy::transports::TransportResult;
use capsule_core::{BlockNumber, NodeConfig, NodeError, TxHash};
use tokio::sync::RwLock;

pub use alloy::rpc::types::TransactionRequest;
pub use capabilities::{CapabilityTier, NodeCapabilities};

/// Result type for node client operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Provider wrapper with timeouts and capability detection
#[derive(Clone)]
pub struct RpcClient {
    provider: RootProvider<Ethereum>,
    config: NodeConfig,
    expected_chain_id: Option<u64>,
    capabilities: Arc<RwLock<Option<NodeCapabilities>>>,
}

impl RpcClient {
    /// Create a new client and check the endpoint is reachable
    pub async fn new(config: NodeConfig, expected_chain_id: Option<u64>) -> Result<Self> {
        let client = Self::new_unchecked(config, expected_chain_id)?;

        client.refresh_capabilities().await;
        let online = client
            .capabilities()
            .await
            .is_some_and(|caps| caps.is_online);
        if !online {
            return Err(NodeError::Unreachable {
                url: client.config.url.clone(),
            });
        }

        Ok(client)
    }

    /// Create without contacting the node (for testing or when it may be offline)
    pub fn new_unchecked(config: NodeConfig, expected_chain_id: Option<u64>) -> Result<Self> {
        let url: reqwest::Url = config.url.parse().map_err(|e| NodeError::Unreachable {
            url: format!("{}: {}", config.url, e),
        })?;

        Ok(Self {
            provider: RootProvider::new_http(url),
            config,
            expected_chain_id,
            capabilities: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the current node configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Refresh capability detection
    pub async fn refresh_capabilities(&self) {
        let caps = capabilities::detect_capabilities(self, self.expected_chain_id).await;
        let mut lock = self.capabilities.write().await;
        *lock = Some(caps);
    }

    /// Get current capabilities (may be stale if not recently refreshed)
    pub async fn capabilities(&self) -> Option<NodeCapabilities> {
        let lock = self.capabilities.read().await;
        lock.clone()
    }

    /// Chain id reported by the node
    pub async fn chain_id(&self) -> Result<u64> {
        self.timed(self.provider.get_chain_id()).await
    }

    /// Current head block
    pub async fn block_number(&self) -> Result<BlockNumber> {
        self.timed(self.provider.get_block_number()).await
    }

    pub async fn sync_status(&self) -> Result<SyncStatus> {
        self.timed(self.provider.syncing()).await
    }

    /// Check if node is online
    pub async fn is_online(&self) -> bool {
        self.block_number().await.is_ok()
    }

    /// Client identification from `web3_clientVersion`
    pub async fn client_version(&self) -> Option<String> {
        self.timed(self.provider.get_client_version()).await.ok()
    }

    /// Accounts exposed by a wallet endpoint
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.timed(self.provider.get_accounts()).await
    }

    /// Native balance at the latest block
    pub async fn get_balance(&self, address: Address) -> Result<U256> {
        self.timed(self.provider.get_balance(address)).await
    }

    /// Read-only contract call at the latest block
    pub async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        self.timed(self.provider.call(tx)).await
    }

    /// Submit a transaction for the wallet endpoint to sign and broadcast
    pub async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let pending = self.timed(self.provider.send_transaction(tx)).await?;
        Ok(TxHash::new(pending.tx_hash().to_string()))
    }

    /// Receipt of a mined transaction, `None` while pending
    pub async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<TransactionReceipt>> {
        let hash: B256 = hash
            .as_str()
            .parse()
            .map_err(|e| NodeError::ParseError(format!("invalid tx hash '{}': {}", hash, e)))?;
        self.timed(self.provider.get_transaction_receipt(hash)).await
    }

    /// Run a provider call under the configured timeout
    async fn timed<T, F>(&self, call: F) -> Result<T>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        let secs = self.config.timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), call.into_future()).await {
            Ok(result) => result.map_err(|e| queries::node_error(e, &self.config.url)),
            Err(_) => Err(NodeError::Timeout { secs }),
        }
    }
}
