//! Post-unlock refresh scheduling
//!
//! Every successful unlock hands its transaction hash to the watcher, which
//! waits (for a receipt, or a fixed delay) and then re-reads the beneficiary
//! list exactly once. The re-read is what moves a capsule out of
//! `UnlockSubmitted`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use capsule_core::{CapsuleTokenId, RefreshPolicy, TxHash};
use serde::Serialize;

use crate::constants::CONFIRMATION_LOG_ATTEMPTS;
use crate::flows::UnlockFlow;

// ─── Types ───────────────────────────────────────────────────────────────────

struct PendingRefresh {
    id: String,
    token_id: CapsuleTokenId,
    tx_hash: TxHash,
    scheduled_at: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingRefreshInfo {
    pub id: String,
    pub token_id: CapsuleTokenId,
    pub tx_hash: TxHash,
    /// "await_confirmation" | "fixed_delay"
    pub mode: String,
    pub elapsed_secs: u64,
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    Confirmed,
    Reverted,
    TimedOut,
    Elapsed,
}

impl WaitOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Reverted => "reverted",
            Self::TimedOut => "timeout",
            Self::Elapsed => "elapsed",
        }
    }
}

// ─── RefreshWatcher ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RefreshWatcher {
    policy: RefreshPolicy,
    pending: Arc<Mutex<Vec<PendingRefresh>>>,
    completed: Arc<AtomicU64>,
}

impl RefreshWatcher {
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            pending: Arc::new(Mutex::new(Vec::new())),
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Refreshes still waiting to fire
    pub fn pending(&self) -> Vec<PendingRefreshInfo> {
        let mode = self.mode().to_string();
        self.items()
            .iter()
            .map(|item| PendingRefreshInfo {
                id: item.id.clone(),
                token_id: item.token_id,
                tx_hash: item.tx_hash.clone(),
                mode: mode.clone(),
                elapsed_secs: item.scheduled_at.elapsed().as_secs(),
            })
            .collect()
    }

    /// Number of refreshes fired since startup
    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Schedule the single refresh owed to a successful unlock.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn schedule(
        &self,
        flow: UnlockFlow,
        token_id: CapsuleTokenId,
        tx_hash: TxHash,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.items().push(PendingRefresh {
            id: id.clone(),
            token_id,
            tx_hash: tx_hash.clone(),
            scheduled_at: Instant::now(),
        });

        tracing::debug!(
            id = %id,
            token_id,
            tx_hash = %tx_hash,
            mode = self.mode(),
            "Refresh scheduled"
        );

        let watcher = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let outcome = watcher.wait(&flow, &tx_hash).await;
            watcher.fire(&flow, &task_id, token_id, &tx_hash, outcome).await;
        });

        id
    }

    async fn wait(&self, flow: &UnlockFlow, tx_hash: &TxHash) -> WaitOutcome {
        match self.policy {
            RefreshPolicy::FixedDelay { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                WaitOutcome::Elapsed
            }
            RefreshPolicy::AwaitConfirmation {
                poll_interval_ms,
                timeout_secs,
            } => {
                let started = Instant::now();
                let deadline = Duration::from_secs(timeout_secs);
                let mut attempts: u32 = 0;

                loop {
                    attempts += 1;
                    match flow.chain().confirmation(tx_hash).await {
                        Ok(Some(true)) => return WaitOutcome::Confirmed,
                        Ok(Some(false)) => return WaitOutcome::Reverted,
                        Ok(None) => {}
                        Err(e) if attempts <= CONFIRMATION_LOG_ATTEMPTS => {
                            tracing::warn!(
                                tx_hash = %tx_hash,
                                attempts,
                                error = %e,
                                "Receipt lookup failed"
                            );
                        }
                        Err(e) => {
                            tracing::trace!(
                                tx_hash = %tx_hash,
                                attempts,
                                error = %e,
                                "Receipt lookup failed"
                            );
                        }
                    }

                    if started.elapsed() >= deadline {
                        return WaitOutcome::TimedOut;
                    }
                    tokio::time::sleep(Duration::from_millis(poll_interval_ms)).await;
                }
            }
        }
    }

    async fn fire(
        &self,
        flow: &UnlockFlow,
        id: &str,
        token_id: CapsuleTokenId,
        tx_hash: &TxHash,
        outcome: WaitOutcome,
    ) {
        match outcome {
            WaitOutcome::Reverted => {
                tracing::warn!(token_id, tx_hash = %tx_hash, "Unlock transaction reverted")
            }
            WaitOutcome::TimedOut => {
                tracing::warn!(
                    token_id,
                    tx_hash = %tx_hash,
                    "No receipt before timeout, refreshing anyway"
                )
            }
            _ => {}
        }

        if let Err(e) = flow.refresh().await {
            tracing::warn!(token_id, error = %e, "Post-unlock refresh failed");
        }
        flow.settle(token_id, tx_hash);

        self.items().retain(|item| item.id != id);
        self.completed.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            token_id,
            tx_hash = %tx_hash,
            outcome = outcome.as_str(),
            "Capsules refreshed after unlock"
        );
    }

    /// "await_confirmation" | "fixed_delay"
    pub fn mode(&self) -> &'static str {
        match self.policy {
            RefreshPolicy::AwaitConfirmation { .. } => "await_confirmation",
            RefreshPolicy::FixedDelay { .. } => "fixed_delay",
        }
    }

    fn items(&self) -> MutexGuard<'_, Vec<PendingRefresh>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
