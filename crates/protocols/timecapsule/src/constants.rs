//! Capsule contract constants and UI labels

/// JSON-RPC error code for a user-rejected request (EIP-1193)
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC error code used by geth-style nodes for reverted execution
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Button label for a capsule that can be unlocked
pub const UNLOCK_LABEL: &str = "Unlock Capsule";

/// Button label while the unlock write is in flight
pub const UNLOCKING_LABEL: &str = "Unlocking...";

/// Button label once the unlock is submitted and awaiting a refresh
pub const SUBMITTED_LABEL: &str = "Unlock Submitted";

/// Prefix of the disabled button label for locked capsules
pub const LOCKED_UNTIL_PREFIX: &str = "Locked until";

/// Failed receipt lookups logged at warn level before dropping to trace
pub const CONFIRMATION_LOG_ATTEMPTS: u32 = 5;
