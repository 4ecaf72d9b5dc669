//! API route handlers

pub mod capsules;
pub mod health;
pub mod node;
pub mod wallet;
pub mod watcher;

use axum::{http::StatusCode, routing::get, Json, Router};
use capsule_core::ProtocolError;

use crate::dto::ApiError;
use crate::AppState;

/// Error half of every handler result
pub type ApiFailure = (StatusCode, Json<ApiError>);

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/watcher", get(watcher::get_watcher))
        .nest("/node", node::router())
        .nest("/wallet", wallet::router())
        .nest("/capsules", capsules::router())
        .with_state(state)
}

pub(crate) fn failure(status: u16, code: &str, message: impl Into<String>) -> ApiFailure {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(ApiError::new(code, message)),
    )
}

pub(crate) fn protocol_failure(e: ProtocolError) -> ApiFailure {
    failure(e.status_code(), e.error_code(), e.to_string())
}

pub(crate) fn core_failure(e: capsule_core::Error) -> ApiFailure {
    match e {
        capsule_core::Error::Protocol(e) => protocol_failure(e),
        capsule_core::Error::Transaction(e) => {
            failure(e.status_code(), e.error_code(), e.user_message())
        }
        capsule_core::Error::Node(e) => failure(502, "node_error", e.to_string()),
        capsule_core::Error::Config(message) => failure(500, "config_error", message),
        capsule_core::Error::Serialization(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal(message)),
        ),
    }
}
