//! Application state shared across API handlers

use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::Address;
use capsule_core::time::now_unix;
use capsule_core::{parse_account_address, AppConfig, Network, NodeConfig, NodeError, ProtocolError};
use evm_node_client::RpcClient;
use thiserror::Error;
use timecapsule::{
    CapsuleChain, ChainHandle, CreationFlow, CreationRules, RefreshWatcher, RpcCapsuleChain,
    UnlockFlow, ViewContext,
};
use tokio::sync::RwLock;

/// Errors that can occur in the API layer
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid wallet address format
    #[error("Invalid wallet address: {reason}")]
    InvalidAddress { reason: String },

    #[error("Wallet endpoint exposes no accounts")]
    NoAccounts,

    #[error("Wallet endpoint error: {0}")]
    Wallet(#[from] NodeError),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "invalid_address",
            Self::NoAccounts => "no_accounts",
            Self::Wallet(_) => "wallet_unavailable",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAddress { .. } => 400,
            Self::NoAccounts => 401,
            Self::Wallet(_) => 502,
        }
    }
}

/// State representing a connected wallet account.
#[derive(Clone, Debug)]
pub struct WalletState {
    pub address: Address,
    /// When the wallet was connected
    pub connected_at: Instant,
}

impl WalletState {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            connected_at: Instant::now(),
        }
    }
}

/// Creation and unlock flows sharing one chain handle
#[derive(Clone)]
pub struct Flows {
    pub creation: CreationFlow,
    pub unlock: UnlockFlow,
    pub chain: ChainHandle,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RwLock<AppConfig>,
    node_client: RwLock<Option<RpcClient>>,
    wallet: RwLock<Option<WalletState>>,
    flows: RwLock<Option<Flows>>,
    /// Chain handle supplied by the caller; kept across node reconfiguration
    fixed_chain: Option<Arc<dyn CapsuleChain>>,
}

impl AppState {
    /// Create state talking to the configured node and contract
    pub fn new(config: AppConfig) -> Self {
        let flows = match rpc_chain(&config).and_then(|chain| build_flows(&config, chain)) {
            Ok(flows) => Some(flows),
            Err(e) => {
                tracing::warn!(error = %e, "Capsule flows unavailable");
                None
            }
        };
        Self::from_parts(config, flows, None)
    }

    /// Create state over an existing chain handle
    pub fn with_chain(
        config: AppConfig,
        chain: Arc<dyn CapsuleChain>,
    ) -> Result<Self, capsule_core::Error> {
        let flows = build_flows(&config, chain.clone())?;
        Ok(Self::from_parts(config, Some(flows), Some(chain)))
    }

    fn from_parts(
        config: AppConfig,
        flows: Option<Flows>,
        fixed_chain: Option<Arc<dyn CapsuleChain>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config: RwLock::new(config),
                node_client: RwLock::new(None),
                wallet: RwLock::new(None),
                flows: RwLock::new(flows),
                fixed_chain,
            }),
        }
    }

    /// Get current config
    pub async fn config(&self) -> AppConfig {
        self.inner.config.read().await.clone()
    }

    /// Get current network
    pub async fn network(&self) -> Network {
        self.inner.config.read().await.network
    }

    /// Update node configuration.
    ///
    /// Existing flows are kept, so an outstanding deposit or unlock still
    /// blocks a second write; only the chain behind them is replaced. The
    /// connected account's capsules are then re-read from the new endpoint.
    pub async fn set_node_config(&self, node_config: NodeConfig) {
        let config = {
            let mut config = self.inner.config.write().await;
            config.node = node_config;
            config.clone()
        };

        *self.inner.node_client.write().await = None;

        if self.inner.fixed_chain.is_none() {
            match (rpc_chain(&config), self.flows().await) {
                (Ok(chain), Some(flows)) => flows.chain.replace(chain),
                (Ok(chain), None) => match build_flows(&config, chain) {
                    Ok(flows) => {
                        if let Some(wallet) = self.wallet().await {
                            flows.unlock.connect(Some(wallet.address));
                        }
                        *self.inner.flows.write().await = Some(flows);
                    }
                    Err(e) => tracing::warn!(
                        error = %e,
                        "Capsule flows unavailable after reconfiguration"
                    ),
                },
                (Err(e), _) => tracing::warn!(
                    error = %e,
                    "Keeping previous chain after failed reconfiguration"
                ),
            }
        }

        self.reload_capsules().await;
    }

    /// Re-read the connected account's capsules; a failed read shows in the view
    pub async fn reload_capsules(&self) {
        let Some(flows) = self.flows().await else {
            return;
        };
        if flows.unlock.account().is_none() {
            return;
        }
        if let Err(e) = flows.unlock.refresh().await {
            tracing::warn!(error = %e, "Capsule reload failed");
        }
    }

    /// Get or create node client
    pub async fn node_client(&self) -> Option<RpcClient> {
        {
            let client = self.inner.node_client.read().await;
            if client.is_some() {
                return client.clone();
            }
        }

        let config = self.inner.config.read().await;
        tracing::info!(url = %config.node.url, "Creating node client");
        match RpcClient::new(config.node.clone(), Some(config.network.chain_id())).await {
            Ok(client) => {
                let mut cached = self.inner.node_client.write().await;
                *cached = Some(client.clone());
                Some(client)
            }
            Err(e) => {
                tracing::warn!(url = %config.node.url, error = %e, "Failed to create node client");
                None
            }
        }
    }

    /// Force refresh node client
    pub async fn refresh_node_client(&self) -> Option<RpcClient> {
        *self.inner.node_client.write().await = None;
        self.node_client().await
    }

    /// Client for the wallet endpoint (not checked for reachability)
    pub async fn wallet_client(&self) -> Result<RpcClient, NodeError> {
        let config = self.inner.config.read().await;
        let wallet_config = NodeConfig {
            url: config.wallet_url().to_string(),
            timeout_secs: config.node.timeout_secs,
        };
        RpcClient::new_unchecked(wallet_config, Some(config.network.chain_id()))
    }

    /// Get current wallet state
    pub async fn wallet(&self) -> Option<WalletState> {
        self.inner.wallet.read().await.clone()
    }

    /// Connect an account, validating its format.
    ///
    /// Without an explicit address, the wallet endpoint's first account is used.
    pub async fn connect_wallet(&self, address: Option<String>) -> Result<WalletState, ApiError> {
        let address = match address {
            Some(raw) => parse_account_address(raw.trim()).map_err(|e| ApiError::InvalidAddress {
                reason: e.to_string(),
            })?,
            None => {
                let accounts = self.wallet_client().await?.accounts().await?;
                accounts.first().copied().ok_or(ApiError::NoAccounts)?
            }
        };

        let wallet = WalletState::new(address);
        *self.inner.wallet.write().await = Some(wallet.clone());
        if let Some(flows) = self.flows().await {
            flows.unlock.connect(Some(address));
        }

        tracing::info!(address = %address, "Wallet connected");
        Ok(wallet)
    }

    /// Disconnect wallet (clear wallet state)
    pub async fn disconnect_wallet(&self) {
        *self.inner.wallet.write().await = None;
        if let Some(flows) = self.flows().await {
            flows.unlock.connect(None);
        }
    }

    pub async fn flows(&self) -> Option<Flows> {
        self.inner.flows.read().await.clone()
    }

    /// Flows, or `ContractNotConfigured` when no chain handle could be built
    pub async fn require_flows(&self) -> Result<Flows, ProtocolError> {
        self.flows().await.ok_or(ProtocolError::ContractNotConfigured)
    }

    /// Formatting context for the current config at the current time
    pub async fn view_context(&self) -> Result<ViewContext, capsule_core::Error> {
        let config = self.inner.config.read().await;
        Ok(ViewContext {
            scale: config.units.scale()?,
            symbol: config.units.symbol.clone(),
            offset: config.display_offset()?,
            explorer_url: config.explorer_url(),
            now: now_unix(),
        })
    }
}

fn rpc_chain(config: &AppConfig) -> Result<Arc<dyn CapsuleChain>, capsule_core::Error> {
    let contract = config.contract_address()?;
    let chain_id = Some(config.network.chain_id());
    let node = RpcClient::new_unchecked(config.node.clone(), chain_id)?;
    let wallet = RpcClient::new_unchecked(
        NodeConfig {
            url: config.wallet_url().to_string(),
            timeout_secs: config.node.timeout_secs,
        },
        chain_id,
    )?;
    Ok(Arc::new(RpcCapsuleChain::new(contract, node, wallet)))
}

fn build_flows(
    config: &AppConfig,
    chain: Arc<dyn CapsuleChain>,
) -> Result<Flows, capsule_core::Error> {
    let rules = CreationRules {
        amounts: config.units.amount_rules()?,
        policy: config.unlock_policy,
    };
    let explorer_url = config.explorer_url();
    let chain = ChainHandle::new(chain);

    Ok(Flows {
        creation: CreationFlow::new(chain.clone(), rules, explorer_url.clone()),
        unlock: UnlockFlow::new(
            chain.clone(),
            RefreshWatcher::new(config.refresh),
            explorer_url,
        ),
        chain,
    })
}
