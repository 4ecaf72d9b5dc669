//! Error types for the capsule client

use thiserror::Error;

/// Core errors that can occur in the capsule client
#[derive(Debug, Error)]
pub enum Error {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// JSON-RPC connection and query errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Node unreachable at {url}")]
    Unreachable { url: String },

    #[error("Node returned error: {message}")]
    ApiError { message: String },

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        /// Raw `data` member, usually hex revert data
        data: Option<String>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Node request timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Capsule flow errors (validation and state machine guards)
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("No wallet account connected")]
    NotConnected,

    #[error("Capsule contract address is not configured")]
    ContractNotConfigured,

    #[error("Capsule state unavailable: {reason}")]
    StateUnavailable { reason: String },

    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Invalid unlock date: {message}")]
    InvalidUnlockDate { message: String },

    #[error("Capsule #{token_id} is not ready to be unlocked yet (unlocks at {unlock_timestamp})")]
    NotYetUnlockable {
        token_id: u64,
        unlock_timestamp: u64,
    },

    #[error("Capsule #{token_id} not found")]
    CapsuleNotFound { token_id: u64 },

    #[error("Capsule #{token_id} is already being unlocked")]
    AlreadyUnlocking { token_id: u64 },

    #[error("Unlock for capsule #{token_id} already submitted, waiting for refresh")]
    AlreadySubmitted { token_id: u64 },

    #[error("A capsule creation is already in flight")]
    SubmissionInFlight,

    #[error("Failed to decode contract data: {message}")]
    DecodeError { message: String },
}

impl ProtocolError {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::ContractNotConfigured => "contract_not_configured",
            Self::StateUnavailable { .. } => "state_unavailable",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidUnlockDate { .. } => "invalid_unlock_date",
            Self::NotYetUnlockable { .. } => "not_yet_unlockable",
            Self::CapsuleNotFound { .. } => "capsule_not_found",
            Self::AlreadyUnlocking { .. } => "already_unlocking",
            Self::AlreadySubmitted { .. } => "already_submitted",
            Self::SubmissionInFlight => "submission_in_flight",
            Self::DecodeError { .. } => "decode_error",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAddress { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidUnlockDate { .. } => 400,
            Self::NotConnected => 401,
            Self::CapsuleNotFound { .. } => 404,
            Self::AlreadyUnlocking { .. }
            | Self::AlreadySubmitted { .. }
            | Self::SubmissionInFlight => 409,
            Self::NotYetUnlockable { .. } => 422,
            Self::ContractNotConfigured => 503,
            Self::StateUnavailable { .. } | Self::DecodeError { .. } => 503,
        }
    }
}

/// Write-call failures.
///
/// All variants are surfaced the same way: the flow clears its in-flight
/// marker and reports [`TxError::user_message`]. Nothing is retried.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("Transaction rejected by wallet: {message}")]
    Rejected { message: String },

    #[error("Execution reverted: {message}")]
    Reverted {
        /// Decoded `Error(string)` reason, when the node returned revert data
        reason: Option<String>,
        message: String,
    },

    #[error("Transaction submission failed: {message}")]
    SubmissionFailed { message: String },

    #[error("Wallet endpoint unavailable: {message}")]
    Transport { message: String },
}

impl TxError {
    /// Human-readable reason: the revert reason if present, else the message
    pub fn user_message(&self) -> String {
        match self {
            Self::Reverted {
                reason: Some(reason),
                ..
            } => reason.clone(),
            Self::Reverted { message, .. }
            | Self::Rejected { message }
            | Self::SubmissionFailed { message }
            | Self::Transport { message } => message.clone(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "tx_rejected",
            Self::Reverted { .. } => "tx_reverted",
            Self::SubmissionFailed { .. } => "tx_failed",
            Self::Transport { .. } => "wallet_unavailable",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Rejected { .. } | Self::Reverted { .. } => 422,
            Self::SubmissionFailed { .. } | Self::Transport { .. } => 502,
        }
    }
}

/// Result type alias for capsule operations
pub type Result<T> = std::result::Result<T, Error>;
