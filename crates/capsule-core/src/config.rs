//! Configuration types for the capsule client

use std::path::Path;

use alloy_primitives::{Address, U256};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::time::UnlockDatePolicy;
use crate::types::constants::{
    DEFAULT_DECIMALS, DEFAULT_INPUT_DECIMALS, DEFAULT_REFRESH_DELAY_MS,
};
use crate::units::{AmountRules, UnitScale};
use crate::{parse_account_address, Error, Network, ProtocolError};

/// JSON-RPC node connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node URL (e.g., "https://rpc.testnet.citrea.xyz")
    pub url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: Network::CitreaTestnet.default_rpc_url().to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Wallet endpoint that owns the signing keys.
///
/// Writes go through `eth_sendTransaction` on this endpoint; when unset the
/// node endpoint is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// Capsule contract location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Contract address (0x + 40 hex)
    #[serde(default)]
    pub address: Option<String>,

    /// Explorer override; falls back to the network default
    #[serde(default)]
    pub explorer_url: Option<String>,
}

/// Value scaling and amount validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitsConfig {
    /// Decimals of the smallest unit used on-chain
    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// Known precision of the deposited asset; a mismatch fails validation
    #[serde(default)]
    pub expected_decimals: Option<u8>,

    /// Fractional digits accepted from user input
    #[serde(default = "default_input_decimals")]
    pub input_decimals: u8,

    /// Inclusive minimum deposit in display units; unset means "> 0"
    #[serde(default)]
    pub min_deposit: Option<String>,

    #[serde(default = "default_symbol")]
    pub symbol: String,
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

fn default_input_decimals() -> u8 {
    DEFAULT_INPUT_DECIMALS
}

fn default_symbol() -> String {
    "BTC".to_string()
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            expected_decimals: None,
            input_decimals: default_input_decimals(),
            min_deposit: None,
            symbol: default_symbol(),
        }
    }
}

impl UnitsConfig {
    pub fn scale(&self) -> Result<UnitScale, Error> {
        let scale = UnitScale::new(self.decimals)?;
        if let Some(expected) = self.expected_decimals {
            if expected != self.decimals {
                return Err(Error::Config(format!(
                    "unit scale is {} decimals but the asset uses {}",
                    self.decimals, expected
                )));
            }
        }
        Ok(scale)
    }

    /// Amount rules for the creation form
    pub fn amount_rules(&self) -> Result<AmountRules, Error> {
        let scale = self.scale()?;
        let minimum: Option<U256> = match &self.min_deposit {
            Some(min) => Some(
                scale
                    .parse_amount(min)
                    .map_err(|e| Error::Config(format!("min_deposit: {}", e)))?,
            ),
            None => None,
        };
        Ok(AmountRules {
            scale,
            max_fraction_digits: self.input_decimals.min(self.decimals),
            minimum,
        })
    }
}

/// How the beneficiary list is refreshed after an unlock write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Poll for the transaction receipt, then re-read once
    AwaitConfirmation {
        poll_interval_ms: u64,
        timeout_secs: u64,
    },
    /// Re-read once after a fixed delay
    FixedDelay { delay_ms: u64 },
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::AwaitConfirmation {
            poll_interval_ms: DEFAULT_REFRESH_DELAY_MS,
            timeout_secs: 600,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Node connection settings
    pub node: NodeConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    pub network: Network,

    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default)]
    pub units: UnitsConfig,

    #[serde(default)]
    pub unlock_policy: UnlockDatePolicy,

    #[serde(default)]
    pub refresh: RefreshPolicy,

    /// Offset applied when formatting unlock times
    #[serde(default)]
    pub display_utc_offset_minutes: i32,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_api_port() -> u16 {
    19054
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            wallet: WalletConfig::default(),
            network: Network::CitreaTestnet,
            contract: ContractConfig::default(),
            units: UnitsConfig::default(),
            unlock_policy: UnlockDatePolicy::default(),
            refresh: RefreshPolicy::default(),
            display_utc_offset_minutes: 0,
            api_port: default_api_port(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every flow fail later
    pub fn validate(&self) -> Result<(), Error> {
        self.units.amount_rules()?;
        self.display_offset()?;
        if let Some(address) = &self.contract.address {
            parse_account_address(address)
                .map_err(|e| Error::Config(format!("contract address: {}", e)))?;
        }
        if let RefreshPolicy::AwaitConfirmation {
            poll_interval_ms, ..
        } = self.refresh
        {
            if poll_interval_ms == 0 {
                return Err(Error::Config("poll_interval_ms must be positive".into()));
            }
        }
        Ok(())
    }

    /// Endpoint used for account discovery and `eth_sendTransaction`
    pub fn wallet_url(&self) -> &str {
        self.wallet.url.as_deref().unwrap_or(&self.node.url)
    }

    pub fn explorer_url(&self) -> Option<String> {
        self.contract
            .explorer_url
            .clone()
            .or_else(|| self.network.default_explorer_url().map(str::to_string))
    }

    pub fn contract_address(&self) -> Result<Address, ProtocolError> {
        let raw = self
            .contract
            .address
            .as_deref()
            .ok_or(ProtocolError::ContractNotConfigured)?;
        parse_account_address(raw)
    }

    pub fn display_offset(&self) -> Result<FixedOffset, Error> {
        FixedOffset::east_opt(self.display_utc_offset_minutes.saturating_mul(60)).ok_or_else(
            || {
                Error::Config(format!(
                    "display offset of {} minutes is out of range",
                    self.display_utc_offset_minutes
                ))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.node.url, "https://rpc.testnet.citrea.xyz");
        assert_eq!(config.network, Network::CitreaTestnet);
        assert_eq!(config.api_port, 19054);
        assert_eq!(config.units.decimals, 18);
        assert_eq!(config.unlock_policy, UnlockDatePolicy::NextDay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = AppConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.node.url, config.node.url);
        assert_eq!(parsed.refresh, config.refresh);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "node": { "url": "http://127.0.0.1:8545" },
            "network": "local",
            "contract": { "address": "0x5FbDB2315678afecb367f032d93F642f64180aa3" },
            "refresh": { "mode": "fixed_delay", "delay_ms": 2000 }
        }"#;
        let config = AppConfig::from_json_str(json).unwrap();
        assert_eq!(config.node.timeout_secs, 30);
        assert_eq!(config.wallet_url(), "http://127.0.0.1:8545");
        assert_eq!(config.explorer_url(), None);
        assert_eq!(config.refresh, RefreshPolicy::FixedDelay { delay_ms: 2000 });
        assert!(config.contract_address().is_ok());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_contract_address() {
        let config = AppConfig::default();
        assert!(matches!(
            config.contract_address(),
            Err(ProtocolError::ContractNotConfigured)
        ));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = AppConfig::default();
        config.contract.address = Some("0x123".into());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.units.expected_decimals = Some(8);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.units.min_deposit = Some("abc".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_amount_rules_from_config() {
        let mut units = UnitsConfig::default();
        units.min_deposit = Some("0.0001".into());
        let rules = units.amount_rules().unwrap();
        assert_eq!(rules.max_fraction_digits, 8);
        assert!(rules.validate("0.001").is_ok());
        assert!(rules.validate("0.00001").is_err());
    }
}
