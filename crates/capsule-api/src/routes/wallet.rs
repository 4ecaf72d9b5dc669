//! Wallet connection endpoints
//!
//! The connected account scopes the beneficiary view and is the `from` of
//! every write. Signing happens at the wallet endpoint.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::dto::{WalletConnectRequest, WalletStatusResponse};
use crate::routes::{failure, ApiFailure};
use crate::AppState;

/// Create wallet routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/status", get(get_status))
}

/// POST /wallet/connect - Connect an account and load its capsules
pub async fn connect(
    State(state): State<AppState>,
    Json(request): Json<WalletConnectRequest>,
) -> Result<Json<WalletStatusResponse>, ApiFailure> {
    let wallet = state
        .connect_wallet(request.address)
        .await
        .map_err(|e| failure(e.status_code(), e.error_code(), e.to_string()))?;

    state.reload_capsules().await;

    Ok(Json(WalletStatusResponse {
        connected: true,
        address: Some(wallet.address.to_checksum(None)),
        balance: None,
        balance_raw: None,
        connected_secs: Some(0),
    }))
}

/// POST /wallet/disconnect - Forget the connected account
pub async fn disconnect(State(state): State<AppState>) -> Json<WalletStatusResponse> {
    state.disconnect_wallet().await;
    Json(WalletStatusResponse::disconnected())
}

/// GET /wallet/status - Connected account and its native balance
pub async fn get_status(State(state): State<AppState>) -> Json<WalletStatusResponse> {
    let Some(wallet) = state.wallet().await else {
        return Json(WalletStatusResponse::disconnected());
    };

    let balance_raw = match state.node_client().await {
        Some(client) => match client.get_balance(wallet.address).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                tracing::debug!(address = %wallet.address, error = %e, "Balance lookup failed");
                None
            }
        },
        None => None,
    };

    let config = state.config().await;
    let balance = match (balance_raw, config.units.scale()) {
        (Some(raw), Ok(scale)) => Some(format!(
            "{} {}",
            scale.format_amount(raw),
            config.units.symbol
        )),
        _ => None,
    };

    Json(WalletStatusResponse {
        connected: true,
        address: Some(wallet.address.to_checksum(None)),
        balance,
        balance_raw: balance_raw.map(|b| b.to_string()),
        connected_secs: Some(wallet.connected_at.elapsed().as_secs()),
    })
}
