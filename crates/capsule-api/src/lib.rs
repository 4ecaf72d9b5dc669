//! capsule-api: HTTP API layer for the time capsule client
//!
//! Exposes the creation and unlock flows to a local frontend.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::{ApiError, AppState, WalletState};
