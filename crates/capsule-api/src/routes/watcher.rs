//! Refresh watcher endpoint

use axum::{extract::State, Json};

use crate::dto::WatcherResponse;
use crate::routes::{protocol_failure, ApiFailure};
use crate::AppState;

/// GET /watcher - Refreshes scheduled by successful unlocks
pub async fn get_watcher(
    State(state): State<AppState>,
) -> Result<Json<WatcherResponse>, ApiFailure> {
    let flows = state.require_flows().await.map_err(protocol_failure)?;
    let watcher = flows.unlock.watcher();
    Ok(Json(WatcherResponse {
        mode: watcher.mode().to_string(),
        completed: watcher.completed_count(),
        pending: watcher.pending(),
    }))
}
