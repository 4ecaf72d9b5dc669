//! Time capsule endpoints
//!
//! Creation, the beneficiary view and unlock.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use capsule_core::time::now_unix;
use capsule_core::{CapsuleTokenId, ProtocolError};
use timecapsule::{BeneficiaryView, CreationDraft, SubmittedTx};

use crate::dto::CreationFormResponse;
use crate::routes::{core_failure, protocol_failure, ApiFailure};
use crate::AppState;

/// Create capsule routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_capsules).post(create_capsule))
        .route("/refresh", post(refresh_capsules))
        .route("/form", get(get_form))
        .route("/:token_id/unlock", post(unlock_capsule))
}

/// GET /capsules - Capsules of the connected account
pub async fn list_capsules(
    State(state): State<AppState>,
) -> Result<Json<BeneficiaryView>, ApiFailure> {
    let flows = state.require_flows().await.map_err(protocol_failure)?;
    let ctx = state.view_context().await.map_err(core_failure)?;
    Ok(Json(flows.unlock.view(&ctx)))
}

/// POST /capsules/refresh - Re-read the list from the contract
///
/// Read failures are reported inside the view, not as an HTTP error.
pub async fn refresh_capsules(
    State(state): State<AppState>,
) -> Result<Json<BeneficiaryView>, ApiFailure> {
    let flows = state.require_flows().await.map_err(protocol_failure)?;
    if let Err(e @ ProtocolError::NotConnected) = flows.unlock.refresh().await {
        return Err(protocol_failure(e));
    }
    list_capsules(State(state)).await
}

/// GET /capsules/form - Creation form constraints
pub async fn get_form(
    State(state): State<AppState>,
) -> Result<Json<CreationFormResponse>, ApiFailure> {
    let flows = state.require_flows().await.map_err(protocol_failure)?;
    let config = state.config().await;
    let rules = flows.creation.rules();
    let digits = rules.amounts.max_fraction_digits as usize;

    Ok(Json(CreationFormResponse {
        min_date: flows
            .creation
            .min_unlock_date(now_unix())
            .format("%Y-%m-%d")
            .to_string(),
        unlock_policy: rules.policy.as_str().to_string(),
        pending: flows.creation.is_pending(),
        symbol: config.units.symbol,
        decimals: rules.amounts.scale.decimals(),
        step: match digits {
            0 => "1".to_string(),
            n => format!("0.{}1", "0".repeat(n - 1)),
        },
        min_deposit: rules
            .amounts
            .minimum
            .map(|m| rules.amounts.scale.format_amount(m)),
    }))
}

/// POST /capsules - Create a capsule from the connected account
pub async fn create_capsule(
    State(state): State<AppState>,
    Json(draft): Json<CreationDraft>,
) -> Result<Json<SubmittedTx>, ApiFailure> {
    let flows = state.require_flows().await.map_err(protocol_failure)?;
    let from = state.wallet().await.map(|w| w.address);

    let submitted = flows
        .creation
        .submit(from, &draft, now_unix())
        .await
        .map_err(core_failure)?;

    Ok(Json(submitted))
}

/// POST /capsules/:token_id/unlock - Unlock a matured capsule
pub async fn unlock_capsule(
    State(state): State<AppState>,
    Path(token_id): Path<CapsuleTokenId>,
) -> Result<Json<SubmittedTx>, ApiFailure> {
    let flows = state.require_flows().await.map_err(protocol_failure)?;

    let submitted = flows
        .unlock
        .unlock(token_id, now_unix())
        .await
        .map_err(core_failure)?;

    Ok(Json(submitted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use capsule_core::{AppConfig, RefreshPolicy, TxError};
    use timecapsule::testing::{beneficiary, sample_capsule, MockChain};
    use tower::ServiceExt;

    use crate::dto::WalletConnectRequest;
    use crate::routes::{create_router, wallet};

    const DAY: u64 = 86_400;

    fn config() -> AppConfig {
        AppConfig {
            refresh: RefreshPolicy::AwaitConfirmation {
                poll_interval_ms: 5,
                timeout_secs: 5,
            },
            ..AppConfig::default()
        }
    }

    /// State with one matured (#1) and one locked (#2) capsule
    fn state_with_capsules() -> (AppState, Arc<MockChain>) {
        let now = now_unix();
        let chain = Arc::new(MockChain::new());
        chain.set_capsules(vec![
            sample_capsule(now - DAY, 1_000_000_000_000_000),
            sample_capsule(now + 30 * DAY, 2_500_000_000_000_000),
        ]);
        let state = AppState::with_chain(config(), chain.clone()).unwrap();
        (state, chain)
    }

    async fn connect(state: &AppState) {
        wallet::connect(
            State(state.clone()),
            Json(WalletConnectRequest {
                address: Some("0x123400000000000000000000000000000000abcd".into()),
            }),
        )
        .await
        .unwrap();
    }

    fn draft(recipient: &str, amount: &str) -> CreationDraft {
        let date = capsule_core::time::today_utc(now_unix())
            .succ_opt()
            .unwrap()
            .format("%Y-%m-%d")
            .to_string();
        CreationDraft {
            recipient: recipient.into(),
            amount: amount.into(),
            unlock_date: date,
        }
    }

    #[tokio::test]
    async fn test_list_requires_connection() {
        let (state, chain) = state_with_capsules();
        let view = list_capsules(State(state)).await.unwrap().0;
        assert!(matches!(view, BeneficiaryView::NotConnected));
        assert_eq!(chain.read_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_loads_capsules() {
        let (state, chain) = state_with_capsules();
        connect(&state).await;
        assert_eq!(chain.read_count(), 1);

        let view = list_capsules(State(state)).await.unwrap().0;
        let cards = view.cards();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "Capsule #1");
        assert_eq!(cards[0].badge, "Ready");
        assert_eq!(cards[0].amount, "0.001 BTC");
        assert_eq!(cards[1].amount, "0.0025 BTC");
        assert_eq!(cards[1].badge, "Locked");
        assert_eq!(cards[0].beneficiary, "0x1234...abcd");
    }

    #[tokio::test]
    async fn test_refresh_reports_read_failure_in_view() {
        let (state, chain) = state_with_capsules();
        let err = refresh_capsules(State(state.clone())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        connect(&state).await;
        chain.fail_reads(true);
        let view = refresh_capsules(State(state)).await.unwrap().0;
        match view {
            BeneficiaryView::NoCapsules { load_error } => assert!(load_error.is_some()),
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unlock_locked_capsule_is_rejected() {
        let (state, chain) = state_with_capsules();
        connect(&state).await;

        let err = unlock_capsule(State(state), Path(2)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.1.code, "not_yet_unlockable");
        assert_eq!(chain.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_unlock_ready_capsule() {
        let (state, chain) = state_with_capsules();
        connect(&state).await;

        let submitted = unlock_capsule(State(state.clone()), Path(1)).await.unwrap().0;
        assert!(submitted.tx_hash.is_well_formed());
        assert!(submitted
            .explorer_url
            .unwrap()
            .starts_with("https://explorer.citreatestnet.io/tx/0x"));
        assert_eq!(chain.unlocks(), vec![(beneficiary(), 1)]);

        let view = list_capsules(State(state.clone())).await.unwrap().0;
        assert_eq!(view.cards()[0].button.label, "Unlock Submitted");
        assert!(!view.cards()[0].button.enabled);

        let err = unlock_capsule(State(state.clone()), Path(1)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let watcher = crate::routes::watcher::get_watcher(State(state)).await.unwrap().0;
        assert_eq!(watcher.pending.len(), 1);
        assert_eq!(watcher.mode, "await_confirmation");
    }

    #[tokio::test]
    async fn test_unlock_failure_surfaces_reason() {
        let (state, chain) = state_with_capsules();
        connect(&state).await;
        chain.fail_next_write(TxError::Reverted {
            reason: Some("Capsule still locked".into()),
            message: "execution reverted".into(),
        });

        let err = unlock_capsule(State(state.clone()), Path(1)).await.unwrap_err();
        assert_eq!(err.1.code, "tx_reverted");
        assert_eq!(err.1.message, "Capsule still locked");

        let view = list_capsules(State(state)).await.unwrap().0;
        assert_eq!(view.cards()[0].button.label, "Unlock Capsule");
    }

    #[tokio::test]
    async fn test_create_capsule() {
        let (state, chain) = state_with_capsules();

        let err = create_capsule(
            State(state.clone()),
            Json(draft("0x123400000000000000000000000000000000abcd", "0.001")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.1.code, "not_connected");

        connect(&state).await;

        let err = create_capsule(State(state.clone()), Json(draft("0x1234", "0.001")))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1.code, "invalid_address");

        let err = create_capsule(
            State(state.clone()),
            Json(draft("0x123400000000000000000000000000000000abcd", "0.000000001")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.1.code, "invalid_amount");
        assert_eq!(chain.write_attempts(), 0);

        create_capsule(
            State(state),
            Json(draft("0x123400000000000000000000000000000000abcd", "0.001")),
        )
        .await
        .unwrap();
        let deposits = chain.deposits();
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].1.value.to_string(), "1000000000000000");
    }

    #[tokio::test]
    async fn test_form_constraints() {
        let (state, _) = state_with_capsules();
        let form = get_form(State(state)).await.unwrap().0;
        assert_eq!(form.unlock_policy, "next_day");
        assert_eq!(form.step, "0.00000001");
        assert_eq!(form.decimals, 18);
        assert!(!form.pending);
        assert!(form.min_deposit.is_none());
    }

    #[tokio::test]
    async fn test_missing_contract_is_service_unavailable() {
        let state = AppState::new(AppConfig::default());
        let err = list_capsules(State(state)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.1.code, "contract_not_configured");
    }

    #[tokio::test]
    async fn test_router_paths() {
        let (state, _) = state_with_capsules();
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::get("/capsules").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["state"], "not_connected");

        let response = app
            .oneshot(
                Request::post("/capsules/1/unlock")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
