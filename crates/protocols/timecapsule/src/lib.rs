//! Bitcoin Time Capsule Protocol Implementation
//!
//! A capsule locks native value in the external contract for a beneficiary
//! until a Unix timestamp. This crate validates and encodes deposits, reads
//! the beneficiary's capsules, derives per-capsule unlock eligibility and
//! drives unlock writes with a confirmation-driven refresh.

pub mod abi;
pub mod chain;
pub mod constants;
pub mod fetch;
pub mod flows;
pub mod state;
pub mod tracker;
pub mod tx_builder;
pub mod view;
pub mod watcher;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chain::{CapsuleChain, ChainHandle, RpcCapsuleChain};
pub use fetch::{assign_token_ids, fetch_beneficiary_capsules};
pub use flows::{CreationFlow, UnlockFlow};
pub use state::{
    ActionButton, BeneficiaryView, Capsule, CapsuleCard, CapsuleStatus, OnChainCapsule,
    SubmittedTx,
};
pub use tracker::{UnlockEntry, UnlockTracker};
pub use tx_builder::{CreationDraft, CreationRules, DepositRequest};
pub use view::ViewContext;
pub use watcher::{PendingRefreshInfo, RefreshWatcher};
