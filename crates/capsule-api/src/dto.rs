//! Data Transfer Objects for API requests and responses

use serde::{Deserialize, Serialize};
use timecapsule::PendingRefreshInfo;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Node status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub connected: bool,
    pub url: String,
    pub client_version: Option<String>,
    pub network: String,
    pub expected_chain_id: u64,
    pub chain_id: Option<u64>,
    pub chain_id_matches: Option<bool>,
    pub block_number: u64,
    pub highest_block: Option<u64>,
    pub capability_tier: String,
    pub sync_lag: Option<u64>,
}

/// Node configuration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfigRequest {
    pub url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Wallet connect request; without an address the wallet endpoint is asked
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConnectRequest {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletStatusResponse {
    pub connected: bool,
    pub address: Option<String>,
    /// Native balance with symbol, when the node answered
    pub balance: Option<String>,
    pub balance_raw: Option<String>,
    pub connected_secs: Option<u64>,
}

impl WalletStatusResponse {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            address: None,
            balance: None,
            balance_raw: None,
            connected_secs: None,
        }
    }
}

/// Creation form parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationFormResponse {
    /// Earliest accepted unlock date, `YYYY-MM-DD`
    pub min_date: String,
    pub unlock_policy: String,
    /// A deposit is awaiting its transaction hash
    pub pending: bool,
    pub symbol: String,
    pub decimals: u8,
    /// Smallest accepted input step, e.g. "0.00000001"
    pub step: String,
    pub min_deposit: Option<String>,
}

/// Pending confirmation-driven refreshes
#[derive(Debug, Clone, Serialize)]
pub struct WatcherResponse {
    pub mode: String,
    pub completed: u64,
    pub pending: Vec<PendingRefreshInfo>,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}
