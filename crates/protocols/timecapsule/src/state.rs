//! Capsule state types

use alloy_primitives::{Address, U256};
use capsule_core::{explorer_tx_url, CapsuleTokenId, TxHash, UnixSeconds};
use serde::{Deserialize, Serialize};

/// A capsule record exactly as the contract returns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainCapsule {
    pub btc_amount: U256,
    pub unlock_timestamp: UnixSeconds,
    pub beneficiary: Address,
    pub depositor: Address,
}

/// A capsule the connected account is beneficiary of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capsule {
    /// Identifier passed to `unlock`; positional, see `fetch::assign_token_ids`
    pub token_id: CapsuleTokenId,
    pub depositor: Address,
    pub beneficiary: Address,
    /// Locked value in smallest units
    pub btc_amount: U256,
    /// Unix seconds after which unlock is permitted
    pub unlock_timestamp: UnixSeconds,
}

impl Capsule {
    pub fn is_unlockable(&self, now: UnixSeconds) -> bool {
        capsule_core::time::is_unlockable(self.unlock_timestamp, now)
    }
}

/// Client-observed capsule state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapsuleStatus {
    Locked,
    Ready,
    Unlocking,
    UnlockSubmitted,
}

impl CapsuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Ready => "ready",
            Self::Unlocking => "unlocking",
            Self::UnlockSubmitted => "unlock_submitted",
        }
    }
}

/// Action button state for a capsule card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub label: String,
    pub enabled: bool,
}

/// Display model of a single capsule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleCard {
    pub token_id: CapsuleTokenId,
    pub title: String,
    /// Display amount with symbol, e.g. "0.001 BTC"
    pub amount: String,
    /// Smallest-unit amount as a decimal string
    pub amount_raw: String,
    pub unlock_timestamp: UnixSeconds,
    pub unlock_date: String,
    pub beneficiary: String,
    pub depositor: String,
    pub status: CapsuleStatus,
    /// "Ready" once the unlock time has passed, otherwise "Locked"
    pub badge: String,
    pub button: ActionButton,
    pub tx_hash: Option<TxHash>,
    pub explorer_url: Option<String>,
}

/// What the unlock page shows, in render priority order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BeneficiaryView {
    NotConnected,
    Loading,
    /// Read failed or returned nothing
    NoCapsules { load_error: Option<String> },
    Capsules { capsules: Vec<CapsuleCard> },
}

impl BeneficiaryView {
    pub fn cards(&self) -> &[CapsuleCard] {
        match self {
            Self::Capsules { capsules } => capsules,
            _ => &[],
        }
    }
}

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTx {
    pub tx_hash: TxHash,
    pub explorer_url: Option<String>,
}

impl SubmittedTx {
    pub fn new(tx_hash: TxHash, explorer_base: Option<&str>) -> Self {
        let explorer_url = explorer_base.map(|base| explorer_tx_url(base, tx_hash.as_str()));
        Self {
            tx_hash,
            explorer_url,
        }
    }
}
