//! Node status and configuration endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use capsule_core::NodeConfig;

use crate::dto::{NodeConfigRequest, NodeStatusResponse};
use crate::routes::{failure, ApiFailure};
use crate::AppState;

/// Create node routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/configure", post(configure))
}

/// GET /node/status - Get current node status
pub async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<NodeStatusResponse>, ApiFailure> {
    let config = state.config().await;
    let expected_chain_id = config.network.chain_id();

    let offline = NodeStatusResponse {
        connected: false,
        url: config.node.url.clone(),
        client_version: None,
        network: config.network.as_str().to_string(),
        expected_chain_id,
        chain_id: None,
        chain_id_matches: None,
        block_number: 0,
        highest_block: None,
        capability_tier: "Offline".to_string(),
        sync_lag: None,
    };

    let Some(client) = state.node_client().await else {
        return Ok(Json(offline));
    };

    let client_version = client.client_version().await;
    match client.capabilities().await {
        Some(caps) => Ok(Json(NodeStatusResponse {
            connected: caps.is_online,
            client_version,
            chain_id: caps.chain_id,
            chain_id_matches: caps.chain_id_matches,
            block_number: caps.block_number,
            highest_block: caps.highest_block,
            capability_tier: caps.capability_tier.as_str().to_string(),
            sync_lag: caps.sync_lag(),
            ..offline
        })),
        None => Ok(Json(NodeStatusResponse {
            connected: true,
            client_version,
            ..offline
        })),
    }
}

/// POST /node/configure - Update node configuration
pub async fn configure(
    State(state): State<AppState>,
    Json(request): Json<NodeConfigRequest>,
) -> Result<Json<NodeStatusResponse>, ApiFailure> {
    let url = request.url.trim().to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(failure(400, "bad_request", "Node URL must be http(s)"));
    }

    let current = state.config().await.node;
    let node_config = NodeConfig {
        url,
        timeout_secs: request.timeout_secs.unwrap_or(current.timeout_secs),
    };
    let url = node_config.url.clone();
    state.set_node_config(node_config).await;

    if state.refresh_node_client().await.is_none() {
        tracing::warn!(url = %url, "Configured node is not reachable");
    }

    get_status(State(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use capsule_core::AppConfig;
    use timecapsule::testing::MockChain;

    fn state() -> AppState {
        AppState::with_chain(AppConfig::default(), Arc::new(MockChain::new())).unwrap()
    }

    #[tokio::test]
    async fn test_configure_rejects_non_http_url() {
        let err = configure(
            State(state()),
            Json(NodeConfigRequest {
                url: "ftp://node".into(),
                timeout_secs: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.1.code, "bad_request");
    }

    #[tokio::test]
    async fn test_configure_unreachable_node_reports_offline() {
        let state = state();
        let status = configure(
            State(state.clone()),
            Json(NodeConfigRequest {
                url: "http://127.0.0.1:1".into(),
                timeout_secs: Some(2),
            }),
        )
        .await
        .unwrap()
        .0;

        assert!(!status.connected);
        assert_eq!(status.url, "http://127.0.0.1:1");
        assert_eq!(status.capability_tier, "Offline");
        assert_eq!(state.config().await.node.timeout_secs, 2);
        assert!(state.flows().await.is_some());
    }
}
