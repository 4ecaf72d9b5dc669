//! Core type definitions for the capsule client

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Transaction hash (32 bytes, 0x-prefixed hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the `0x` + 64 hex digit shape
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 66
            && self.0.starts_with("0x")
            && self.0[2..].chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier passed to `unlock(uint256)`
pub type CapsuleTokenId = u64;

/// Unix timestamp in seconds
pub type UnixSeconds = u64;

/// Block number
pub type BlockNumber = u64;

/// Network the contract is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    CitreaTestnet,
    Local,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CitreaTestnet => "citrea-testnet",
            Self::Local => "local",
        }
    }

    /// EIP-155 chain id
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::CitreaTestnet => 5115,
            Self::Local => 31337,
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::CitreaTestnet => "https://rpc.testnet.citrea.xyz",
            Self::Local => "http://127.0.0.1:8545",
        }
    }

    /// Block explorer base URL, if the network has a public one
    pub fn default_explorer_url(&self) -> Option<&'static str> {
        match self {
            Self::CitreaTestnet => Some("https://explorer.citreatestnet.io"),
            Self::Local => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check an account string against `^0x[a-fA-F0-9]{40}$`
pub fn is_account_address(input: &str) -> bool {
    input.len() == 42
        && input.starts_with("0x")
        && input[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse a user-supplied account string into an EVM address.
///
/// Mixed-case input is accepted without checksum verification, matching the
/// plain hex pattern enforced at the form level.
pub fn parse_account_address(input: &str) -> Result<Address, ProtocolError> {
    if !is_account_address(input) {
        return Err(ProtocolError::InvalidAddress {
            address: input.to_string(),
        });
    }
    Address::from_str(input).map_err(|_| ProtocolError::InvalidAddress {
        address: input.to_string(),
    })
}

/// Constants
pub mod constants {
    use super::UnixSeconds;

    /// Grace period applied to same-day unlock dates (5 minutes)
    pub const SAME_DAY_GRACE_SECS: UnixSeconds = 300;

    /// Native unit precision assumed by the deployed contract
    pub const DEFAULT_DECIMALS: u8 = 18;

    /// Largest scale accepted for the smallest-unit conversion
    pub const MAX_DECIMALS: u8 = 36;

    /// Fractional digits accepted at input (0.00000001 BTC step)
    pub const DEFAULT_INPUT_DECIMALS: u8 = 8;

    /// Fixed re-read delay used when confirmation polling is disabled
    pub const DEFAULT_REFRESH_DELAY_MS: u64 = 2_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_address_pattern() {
        assert!(is_account_address(
            "0x1234000000000000000000000000000000abcdEF"
        ));
        assert!(!is_account_address("1234000000000000000000000000000000abcdef"));
        assert!(!is_account_address("0x1234"));
        assert!(!is_account_address(
            "0X1234000000000000000000000000000000abcdef"
        ));
        assert!(!is_account_address(
            "0x1234000000000000000000000000000000abcdeg"
        ));
    }

    #[test]
    fn test_parse_account_address() {
        let addr = parse_account_address("0x1234000000000000000000000000000000abcdef").unwrap();
        assert_eq!(addr.as_slice()[0], 0x12);
        assert_eq!(addr.as_slice()[19], 0xef);

        let err = parse_account_address("not-an-address").unwrap_err();
        assert_eq!(err.error_code(), "invalid_address");
    }

    #[test]
    fn test_tx_hash_shape() {
        let good = TxHash::new(format!("0x{}", "ab".repeat(32)));
        assert!(good.is_well_formed());
        assert!(!TxHash::new("0xabc").is_well_formed());
    }

    #[test]
    fn test_network_params() {
        assert_eq!(Network::CitreaTestnet.as_str(), "citrea-testnet");
        assert_eq!(Network::CitreaTestnet.chain_id(), 5115);
        assert_eq!(
            Network::CitreaTestnet.default_explorer_url(),
            Some("https://explorer.citreatestnet.io")
        );
        assert_eq!(Network::Local.default_explorer_url(), None);
    }
}
