//! Capsule creation and unlock flows
//!
//! Both flows are cheap to clone and safe to share between request handlers.
//! Locks are never held across a chain call; in-flight markers are cleared by
//! drop guards so an abandoned request cannot leave a capsule stuck.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::Address;
use capsule_core::time::min_unlock_date;
use capsule_core::{CapsuleTokenId, ProtocolError, UnixSeconds};
use chrono::NaiveDate;

use crate::chain::{CapsuleChain, ChainHandle};
use crate::fetch::fetch_beneficiary_capsules;
use crate::state::{BeneficiaryView, Capsule, CapsuleStatus, SubmittedTx};
use crate::tracker::UnlockTracker;
use crate::tx_builder::{CreationDraft, CreationRules};
use crate::view::{build_card, ViewContext};
use crate::watcher::RefreshWatcher;

// =============================================================================
// Creation
// =============================================================================

#[derive(Clone)]
pub struct CreationFlow {
    inner: Arc<CreationInner>,
}

struct CreationInner {
    chain: ChainHandle,
    rules: CreationRules,
    explorer_url: Option<String>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CreationFlow {
    pub fn new(
        chain: ChainHandle,
        rules: CreationRules,
        explorer_url: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(CreationInner {
                chain,
                rules,
                explorer_url,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    pub fn rules(&self) -> &CreationRules {
        &self.inner.rules
    }

    /// True while a deposit is awaiting its transaction hash
    pub fn is_pending(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Earliest date the form accepts
    pub fn min_unlock_date(&self, now: UnixSeconds) -> NaiveDate {
        min_unlock_date(self.inner.rules.policy, now)
    }

    /// Validate `draft` and submit one `deposit` write from `from`.
    pub async fn submit(
        &self,
        from: Option<Address>,
        draft: &CreationDraft,
        now: UnixSeconds,
    ) -> capsule_core::Result<SubmittedTx> {
        let from = from.ok_or(ProtocolError::NotConnected)?;

        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ProtocolError::SubmissionInFlight.into());
        }
        let _guard = InFlightGuard(&self.inner.in_flight);

        let request = draft.validate(&self.inner.rules, now)?;

        tracing::info!(
            from = %from,
            beneficiary = %request.beneficiary,
            value = %request.value,
            unlock_timestamp = request.unlock_timestamp,
            "Creating capsule"
        );

        let chain = self.inner.chain.current();
        let tx_hash = match chain.deposit(from, &request).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(error = %e, "Capsule creation failed");
                return Err(e.into());
            }
        };

        Ok(SubmittedTx::new(tx_hash, self.inner.explorer_url.as_deref()))
    }
}

// =============================================================================
// Unlock
// =============================================================================

#[derive(Debug, Clone)]
enum ListState {
    Idle,
    Loading,
    Loaded(Vec<Capsule>),
    Failed(String),
}

struct FlowState {
    account: Option<Address>,
    list: ListState,
    tracker: UnlockTracker,
    /// Bumped on account change; reads and writes from an older generation are dropped
    generation: u64,
}

impl FlowState {
    fn capsule(&self, token_id: CapsuleTokenId) -> Option<&Capsule> {
        match &self.list {
            ListState::Loaded(capsules) => capsules.iter().find(|c| c.token_id == token_id),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct UnlockFlow {
    inner: Arc<UnlockInner>,
}

struct UnlockInner {
    chain: ChainHandle,
    watcher: RefreshWatcher,
    explorer_url: Option<String>,
    state: Mutex<FlowState>,
}

/// Returns the capsule to `Ready` unless disarmed
struct UnlockGuard<'a> {
    flow: &'a UnlockFlow,
    token_id: CapsuleTokenId,
    generation: u64,
    armed: bool,
}

impl Drop for UnlockGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.flow.state();
        if state.generation == self.generation {
            state.tracker.fail(self.token_id);
        }
    }
}

impl UnlockFlow {
    pub fn new(
        chain: ChainHandle,
        watcher: RefreshWatcher,
        explorer_url: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(UnlockInner {
                chain,
                watcher,
                explorer_url,
                state: Mutex::new(FlowState {
                    account: None,
                    list: ListState::Idle,
                    tracker: UnlockTracker::new(),
                    generation: 0,
                }),
            }),
        }
    }

    pub(crate) fn chain(&self) -> Arc<dyn CapsuleChain> {
        self.inner.chain.current()
    }

    pub fn watcher(&self) -> &RefreshWatcher {
        &self.inner.watcher
    }

    pub fn account(&self) -> Option<Address> {
        self.state().account
    }

    /// Switch the connected account. Returns true if it changed.
    ///
    /// A change drops the loaded list and every unlock entry.
    pub fn connect(&self, account: Option<Address>) -> bool {
        let mut state = self.state();
        if state.account == account {
            return false;
        }
        state.account = account;
        state.list = ListState::Idle;
        state.tracker.clear();
        state.generation += 1;

        tracing::info!(account = ?account, generation = state.generation, "Account changed");
        true
    }

    /// Re-read the connected account's capsules.
    ///
    /// A successful read settles every unlock that was already submitted when
    /// the read started, since the new list reflects it.
    pub async fn refresh(&self) -> Result<usize, ProtocolError> {
        let (account, generation, submitted) = {
            let mut state = self.state();
            let account = state.account.ok_or(ProtocolError::NotConnected)?;
            if !matches!(state.list, ListState::Loaded(_)) {
                state.list = ListState::Loading;
            }
            (account, state.generation, state.tracker.submitted())
        };

        let chain = self.chain();
        let result = fetch_beneficiary_capsules(chain.as_ref(), account).await;

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!(account = %account, "Discarding capsule read for previous account");
            return result.map(|capsules| capsules.len());
        }

        match result {
            Ok(capsules) => {
                let count = capsules.len();
                state.list = ListState::Loaded(capsules);
                for (token_id, tx_hash) in &submitted {
                    if state.tracker.settle(*token_id, tx_hash) {
                        tracing::debug!(
                            token_id,
                            tx_hash = %tx_hash,
                            "Unlock settled by re-read"
                        );
                    }
                }
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "Failed to load capsules");
                state.list = ListState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Snapshot of the loaded capsules
    pub fn capsules(&self) -> Vec<Capsule> {
        match &self.state().list {
            ListState::Loaded(capsules) => capsules.clone(),
            _ => Vec::new(),
        }
    }

    pub fn status(&self, token_id: CapsuleTokenId, now: UnixSeconds) -> Option<CapsuleStatus> {
        let state = self.state();
        let capsule = state.capsule(token_id)?;
        Some(state.tracker.status(token_id, capsule.unlock_timestamp, now))
    }

    pub fn is_unlocking(&self, token_id: CapsuleTokenId) -> bool {
        self.state().tracker.is_unlocking(token_id)
    }

    pub fn view(&self, ctx: &ViewContext) -> BeneficiaryView {
        let state = self.state();
        if state.account.is_none() {
            return BeneficiaryView::NotConnected;
        }
        match &state.list {
            ListState::Idle | ListState::Loading => BeneficiaryView::Loading,
            ListState::Failed(e) => BeneficiaryView::NoCapsules {
                load_error: Some(e.clone()),
            },
            ListState::Loaded(capsules) if capsules.is_empty() => {
                BeneficiaryView::NoCapsules { load_error: None }
            }
            ListState::Loaded(capsules) => BeneficiaryView::Capsules {
                capsules: capsules
                    .iter()
                    .map(|c| build_card(c, &state.tracker, ctx))
                    .collect(),
            },
        }
    }

    /// Submit `unlock(token_id)` for a capsule that is `Ready` at `now`.
    ///
    /// A successful write schedules exactly one list refresh.
    pub async fn unlock(
        &self,
        token_id: CapsuleTokenId,
        now: UnixSeconds,
    ) -> capsule_core::Result<SubmittedTx> {
        let (account, generation) = {
            let mut state = self.state();
            let account = state.account.ok_or(ProtocolError::NotConnected)?;
            let unlock_timestamp = state
                .capsule(token_id)
                .map(|c| c.unlock_timestamp)
                .ok_or(ProtocolError::CapsuleNotFound { token_id })?;
            state.tracker.begin(token_id, unlock_timestamp, now)?;
            (account, state.generation)
        };

        let mut guard = UnlockGuard {
            flow: self,
            token_id,
            generation,
            armed: true,
        };

        tracing::info!(token_id, account = %account, "Unlocking capsule");

        let chain = self.chain();
        let tx_hash = match chain.unlock(account, token_id).await {
            Ok(hash) => hash,
            Err(e) => {
                drop(guard);
                tracing::warn!(token_id, error = %e, "Unlock failed");
                return Err(e.into());
            }
        };
        guard.armed = false;

        let current = {
            let mut state = self.state();
            if state.generation == generation {
                state.tracker.complete(token_id, tx_hash.clone());
                true
            } else {
                false
            }
        };
        if current {
            self.inner
                .watcher
                .schedule(self.clone(), token_id, tx_hash.clone());
        }

        Ok(SubmittedTx::new(tx_hash, self.inner.explorer_url.as_deref()))
    }

    /// Clear the submitted marker for `token_id` if it still carries `tx_hash`
    pub fn settle(&self, token_id: CapsuleTokenId, tx_hash: &capsule_core::TxHash) -> bool {
        self.state().tracker.settle(token_id, tx_hash)
    }

    fn state(&self) -> MutexGuard<'_, FlowState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{beneficiary, sample_capsule, MockChain};
    use capsule_core::{AmountRules, Error, RefreshPolicy, TxError, UnitScale, UnlockDatePolicy};
    use std::time::Duration;

    // 2026-10-18T15:04:05Z
    const NOW: UnixSeconds = 1_792_335_845;

    fn confirmation_policy() -> RefreshPolicy {
        RefreshPolicy::AwaitConfirmation {
            poll_interval_ms: 5,
            timeout_secs: 5,
        }
    }

    fn unlock_flow(chain: &Arc<MockChain>, policy: RefreshPolicy) -> UnlockFlow {
        UnlockFlow::new(
            ChainHandle::new(chain.clone()),
            RefreshWatcher::new(policy),
            Some("https://explorer.citreatestnet.io".into()),
        )
    }

    fn creation_flow(chain: &Arc<MockChain>) -> CreationFlow {
        CreationFlow::new(
            ChainHandle::new(chain.clone()),
            CreationRules {
                amounts: AmountRules {
                    scale: UnitScale::default(),
                    max_fraction_digits: 8,
                    minimum: None,
                },
                policy: UnlockDatePolicy::NextDay,
            },
            None,
        )
    }

    fn draft() -> CreationDraft {
        CreationDraft {
            recipient: "0x123400000000000000000000000000000000abcd".into(),
            amount: "0.001".into(),
            unlock_date: "2026-10-19".into(),
        }
    }

    async fn wait_for_refreshes(flow: &UnlockFlow, n: u64) {
        for _ in 0..200 {
            if flow.watcher().completed_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("refresh did not fire");
    }

    /// One matured capsule (#1) and one locked capsule (#2)
    async fn loaded_flow(chain: &Arc<MockChain>, policy: RefreshPolicy) -> UnlockFlow {
        chain.set_capsules(vec![
            sample_capsule(NOW - 60, 1_000_000_000_000_000),
            sample_capsule(NOW + 86_400, 2_000_000_000_000_000),
        ]);
        let flow = unlock_flow(chain, policy);
        flow.connect(Some(beneficiary()));
        assert_eq!(flow.refresh().await.unwrap(), 2);
        flow
    }

    #[tokio::test]
    async fn test_not_connected_issues_no_read() {
        let chain = Arc::new(MockChain::new());
        let flow = unlock_flow(&chain, confirmation_policy());

        assert!(matches!(
            flow.view(&ViewContext::utc(NOW)),
            BeneficiaryView::NotConnected
        ));
        assert!(matches!(
            flow.refresh().await,
            Err(ProtocolError::NotConnected)
        ));
        assert_eq!(chain.read_count(), 0);
    }

    #[tokio::test]
    async fn test_two_capsule_view() {
        let chain = Arc::new(MockChain::new());
        let flow = loaded_flow(&chain, confirmation_policy()).await;

        let view = flow.view(&ViewContext::utc(NOW));
        let cards = view.cards();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].token_id, 1);
        assert_eq!(cards[1].token_id, 2);
        assert_eq!(cards[0].beneficiary, "0x1234...abcd");
        assert_eq!(cards[0].badge, "Ready");
        assert_eq!(cards[0].amount, "0.001 BTC");
        assert!(cards[0].button.enabled);
        assert_eq!(cards[1].badge, "Locked");
        assert!(cards[1].button.label.starts_with("Locked until"));
        assert!(!cards[1].button.enabled);
    }

    #[tokio::test]
    async fn test_empty_and_failed_reads() {
        let chain = Arc::new(MockChain::new());
        let flow = unlock_flow(&chain, confirmation_policy());
        flow.connect(Some(beneficiary()));
        assert!(matches!(
            flow.view(&ViewContext::utc(NOW)),
            BeneficiaryView::Loading
        ));

        flow.refresh().await.unwrap();
        assert!(matches!(
            flow.view(&ViewContext::utc(NOW)),
            BeneficiaryView::NoCapsules { load_error: None }
        ));

        chain.fail_reads(true);
        assert!(flow.refresh().await.is_err());
        match flow.view(&ViewContext::utc(NOW)) {
            BeneficiaryView::NoCapsules { load_error } => assert!(load_error.is_some()),
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_locked_click_never_writes() {
        let chain = Arc::new(MockChain::new());
        let flow = loaded_flow(&chain, confirmation_policy()).await;

        let err = flow.unlock(2, NOW).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::NotYetUnlockable { token_id: 2, .. })
        ));
        assert_eq!(chain.write_attempts(), 0);
        assert!(!flow.is_unlocking(2));
        assert_eq!(flow.status(2, NOW), Some(CapsuleStatus::Locked));
    }

    #[tokio::test]
    async fn test_unknown_capsule() {
        let chain = Arc::new(MockChain::new());
        let flow = loaded_flow(&chain, confirmation_policy()).await;
        let err = flow.unlock(9, NOW).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::CapsuleNotFound { token_id: 9 })
        ));
        assert_eq!(chain.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_failed_unlock_clears_marker() {
        let chain = Arc::new(MockChain::new());
        let flow = loaded_flow(&chain, confirmation_policy()).await;

        chain.fail_next_write(TxError::Rejected {
            message: "User denied transaction signature".into(),
        });
        let err = flow.unlock(1, NOW).await.unwrap_err();
        assert!(matches!(err, Error::Transaction(TxError::Rejected { .. })));
        assert!(!flow.is_unlocking(1));
        assert_eq!(flow.status(1, NOW), Some(CapsuleStatus::Ready));
        assert!(flow.watcher().pending().is_empty());

        // A retry is a fresh attempt
        flow.unlock(1, NOW).await.unwrap();
        assert_eq!(chain.write_attempts(), 2);
    }

    #[tokio::test]
    async fn test_successful_unlock_refreshes_once() {
        let chain = Arc::new(MockChain::new());
        let flow = loaded_flow(&chain, confirmation_policy()).await;
        assert_eq!(chain.read_count(), 1);

        let submitted = flow.unlock(1, NOW).await.unwrap();
        assert!(!flow.is_unlocking(1));
        assert_eq!(flow.status(1, NOW), Some(CapsuleStatus::UnlockSubmitted));
        assert_eq!(
            submitted.explorer_url,
            Some(format!(
                "https://explorer.citreatestnet.io/tx/{}",
                submitted.tx_hash
            ))
        );
        assert_eq!(chain.unlocks(), vec![(beneficiary(), 1)]);

        let err = flow.unlock(1, NOW).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::AlreadySubmitted { token_id: 1 })
        ));

        let pending = flow.watcher().pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].token_id, 1);
        assert_eq!(pending[0].mode, "await_confirmation");

        // The contract drops the capsule once it is unlocked
        chain.set_capsules(vec![sample_capsule(NOW + 86_400, 2_000_000_000_000_000)]);
        chain.mine(&submitted.tx_hash, true);
        wait_for_refreshes(&flow, 1).await;

        assert_eq!(chain.read_count(), 2);
        assert!(flow.watcher().pending().is_empty());
        assert_eq!(flow.capsules().len(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(chain.read_count(), 2);
        assert_eq!(flow.watcher().completed_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_fires_once_despite_other_clicks() {
        let chain = Arc::new(MockChain::new());
        let flow = loaded_flow(&chain, confirmation_policy()).await;

        let submitted = flow.unlock(1, NOW).await.unwrap();

        // Clicks in the interim: a locked card, an unknown id, the same card again
        assert!(flow.unlock(2, NOW).await.is_err());
        assert!(flow.unlock(9, NOW).await.is_err());
        assert!(flow.unlock(1, NOW).await.is_err());
        assert_eq!(flow.watcher().pending().len(), 1);

        chain.mine(&submitted.tx_hash, true);
        wait_for_refreshes(&flow, 1).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(chain.read_count(), 2);
        assert_eq!(chain.write_attempts(), 1);
        assert_eq!(flow.watcher().completed_count(), 1);
    }

    #[tokio::test]
    async fn test_manual_refresh_settles_submitted_unlock() {
        let chain = Arc::new(MockChain::new());
        chain.set_capsules(vec![
            sample_capsule(NOW - 60, 1),
            sample_capsule(NOW - 60, 2),
        ]);
        let flow = unlock_flow(&chain, RefreshPolicy::FixedDelay { delay_ms: 10_000 });
        flow.connect(Some(beneficiary()));
        flow.refresh().await.unwrap();

        flow.unlock(1, NOW).await.unwrap();
        assert_eq!(flow.status(1, NOW), Some(CapsuleStatus::UnlockSubmitted));

        // The unlocked capsule is gone and the other one moves into position 1
        chain.set_capsules(vec![sample_capsule(NOW - 60, 2)]);
        assert_eq!(flow.refresh().await.unwrap(), 1);

        let capsules = flow.capsules();
        assert_eq!(capsules[0].token_id, 1);
        assert_eq!(capsules[0].btc_amount, alloy_primitives::U256::from(2u8));
        assert_eq!(flow.status(1, NOW), Some(CapsuleStatus::Ready));

        flow.unlock(1, NOW).await.unwrap();
        assert_eq!(chain.unlocks().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_keeps_unlock_submitted_during_read() {
        let chain = Arc::new(MockChain::new());
        chain.set_write_delay(Duration::from_millis(50));
        let flow = loaded_flow(&chain, RefreshPolicy::FixedDelay { delay_ms: 10_000 }).await;

        let pending_unlock = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.unlock(1, NOW).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(flow.is_unlocking(1));

        // A re-read while the write is outstanding leaves the marker alone
        flow.refresh().await.unwrap();
        assert_eq!(flow.status(1, NOW), Some(CapsuleStatus::Unlocking));

        pending_unlock.await.unwrap().unwrap();
        assert_eq!(flow.status(1, NOW), Some(CapsuleStatus::UnlockSubmitted));
    }

    #[tokio::test]
    async fn test_replaced_chain_keeps_creation_in_flight() {
        let first = Arc::new(MockChain::new());
        first.set_write_delay(Duration::from_millis(50));
        let handle = ChainHandle::new(first.clone());
        let flow = CreationFlow::new(
            handle.clone(),
            creation_flow(&first).rules().clone(),
            None,
        );

        let pending = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.submit(Some(beneficiary()), &draft(), NOW).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = Arc::new(MockChain::new());
        handle.replace(second.clone());
        assert!(flow.is_pending());
        let err = flow
            .submit(Some(beneficiary()), &draft(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::SubmissionInFlight)
        ));

        pending.await.unwrap().unwrap();
        assert_eq!(first.deposits().len(), 1);
        assert_eq!(second.write_attempts(), 0);

        flow.submit(Some(beneficiary()), &draft(), NOW)
            .await
            .unwrap();
        assert_eq!(second.deposits().len(), 1);
    }

    #[tokio::test]
    async fn test_fixed_delay_refresh_settles_entry() {
        let chain = Arc::new(MockChain::new());
        let flow = loaded_flow(&chain, RefreshPolicy::FixedDelay { delay_ms: 10 }).await;

        flow.unlock(1, NOW).await.unwrap();
        wait_for_refreshes(&flow, 1).await;

        assert_eq!(chain.read_count(), 2);
        assert_eq!(flow.status(1, NOW), Some(CapsuleStatus::Ready));
    }

    #[tokio::test]
    async fn test_account_change_resets_state() {
        let chain = Arc::new(MockChain::new());
        let flow = loaded_flow(&chain, RefreshPolicy::FixedDelay { delay_ms: 10_000 }).await;
        flow.unlock(1, NOW).await.unwrap();

        assert!(!flow.connect(Some(beneficiary())));
        assert!(flow.connect(Some(crate::testing::depositor())));
        assert!(flow.capsules().is_empty());
        assert_eq!(flow.status(1, NOW), None);

        flow.refresh().await.unwrap();
        assert!(matches!(
            flow.view(&ViewContext::utc(NOW)),
            BeneficiaryView::NoCapsules { load_error: None }
        ));

        flow.connect(None);
        assert!(matches!(
            flow.view(&ViewContext::utc(NOW)),
            BeneficiaryView::NotConnected
        ));
    }

    #[tokio::test]
    async fn test_create_requires_account() {
        let chain = Arc::new(MockChain::new());
        let flow = creation_flow(&chain);
        let err = flow.submit(None, &draft(), NOW).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::NotConnected)));
        assert_eq!(chain.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_without_writing() {
        let chain = Arc::new(MockChain::new());
        let flow = creation_flow(&chain);
        let mut bad = draft();
        bad.recipient = "0xnot-an-address".into();

        let err = flow
            .submit(Some(beneficiary()), &bad, NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::InvalidAddress { .. })
        ));
        assert_eq!(chain.write_attempts(), 0);
        assert!(!flow.is_pending());
    }

    #[tokio::test]
    async fn test_create_submits_deposit() {
        let chain = Arc::new(MockChain::new());
        let flow = creation_flow(&chain);

        flow.submit(Some(crate::testing::depositor()), &draft(), NOW)
            .await
            .unwrap();

        let deposits = chain.deposits();
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].0, crate::testing::depositor());
        assert_eq!(deposits[0].1.beneficiary, beneficiary());
        assert_eq!(deposits[0].1.unlock_timestamp, 1_792_368_000);
        assert_eq!(
            deposits[0].1.value,
            alloy_primitives::U256::from(1_000_000_000_000_000u64)
        );
        assert_eq!(flow.min_unlock_date(NOW).to_string(), "2026-10-19");
    }

    #[tokio::test]
    async fn test_second_create_rejected_while_in_flight() {
        let chain = Arc::new(MockChain::new());
        chain.set_write_delay(Duration::from_millis(50));
        let flow = creation_flow(&chain);

        let first = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.submit(Some(beneficiary()), &draft(), NOW).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(flow.is_pending());

        let err = flow
            .submit(Some(beneficiary()), &draft(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::SubmissionInFlight)
        ));

        first.await.unwrap().unwrap();
        assert!(!flow.is_pending());
        assert_eq!(chain.deposits().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_clears_pending() {
        let chain = Arc::new(MockChain::new());
        chain.fail_next_write(TxError::Reverted {
            reason: Some("Unlock time must be in the future".into()),
            message: "execution reverted".into(),
        });
        let flow = creation_flow(&chain);

        let err = flow
            .submit(Some(beneficiary()), &draft(), NOW)
            .await
            .unwrap_err();
        match err {
            Error::Transaction(tx) => {
                assert_eq!(tx.user_message(), "Unlock time must be in the future")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!flow.is_pending());
    }
}
