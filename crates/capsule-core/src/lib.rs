//! capsule-core: Shared types, errors, configuration and normalization rules
//!
//! This crate provides the foundational types used across the capsule workspace,
//! including the conversions between human-entered dates/amounts and their
//! on-chain representation.

pub mod config;
pub mod display;
pub mod errors;
pub mod time;
pub mod types;
pub mod units;

pub use config::*;
pub use display::{explorer_tx_url, truncate_address};
pub use errors::*;
pub use time::UnlockDatePolicy;
pub use types::*;
pub use units::{AmountRules, UnitScale};
