//! In-memory `CapsuleChain` for flow and router tests

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use capsule_core::{CapsuleTokenId, NodeError, ProtocolError, TxError, TxHash, UnixSeconds};

use crate::chain::CapsuleChain;
use crate::state::OnChainCapsule;
use crate::tx_builder::DepositRequest;

pub fn beneficiary() -> Address {
    Address::from_str("0x123400000000000000000000000000000000abcd").unwrap()
}

pub fn depositor() -> Address {
    Address::from_str("0x9999000000000000000000000000000000001111").unwrap()
}

/// A capsule for [`beneficiary`] deposited by [`depositor`]
pub fn sample_capsule(unlock_timestamp: UnixSeconds, btc_amount: u64) -> OnChainCapsule {
    OnChainCapsule {
        btc_amount: U256::from(btc_amount),
        unlock_timestamp,
        beneficiary: beneficiary(),
        depositor: depositor(),
    }
}

#[derive(Default)]
pub struct MockChain {
    capsules: Mutex<Vec<OnChainCapsule>>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    deposits: Mutex<Vec<(Address, DepositRequest)>>,
    unlocks: Mutex<Vec<(Address, CapsuleTokenId)>>,
    next_write_error: Mutex<Option<TxError>>,
    write_delay: Mutex<Option<Duration>>,
    receipts: Mutex<HashMap<String, bool>>,
    tx_counter: AtomicU64,
    write_attempts: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_capsules(&self, capsules: Vec<OnChainCapsule>) {
        *self.capsules.lock().unwrap() = capsules;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Writes issued, including failed ones
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn deposits(&self) -> Vec<(Address, DepositRequest)> {
        self.deposits.lock().unwrap().clone()
    }

    pub fn unlocks(&self) -> Vec<(Address, CapsuleTokenId)> {
        self.unlocks.lock().unwrap().clone()
    }

    /// Fail the next write with `err`
    pub fn fail_next_write(&self, err: TxError) {
        *self.next_write_error.lock().unwrap() = Some(err);
    }

    /// Hold every write for `delay` before answering
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Mine `tx_hash` with the given outcome
    pub fn mine(&self, tx_hash: &TxHash, success: bool) {
        self.receipts
            .lock()
            .unwrap()
            .insert(tx_hash.as_str().to_string(), success);
    }

    async fn write(&self) -> Result<TxHash, TxError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.next_write_error.lock().unwrap().take() {
            return Err(err);
        }
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxHash::new(format!("0x{:064x}", n)))
    }
}

#[async_trait]
impl CapsuleChain for MockChain {
    async fn beneficiary_capsules(
        &self,
        beneficiary: Address,
    ) -> Result<Vec<OnChainCapsule>, ProtocolError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ProtocolError::StateUnavailable {
                reason: "node unreachable".into(),
            });
        }
        Ok(self
            .capsules
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.beneficiary == beneficiary)
            .cloned()
            .collect())
    }

    async fn deposit(&self, from: Address, request: &DepositRequest) -> Result<TxHash, TxError> {
        let hash = self.write().await?;
        self.deposits.lock().unwrap().push((from, request.clone()));
        Ok(hash)
    }

    async fn unlock(&self, from: Address, token_id: CapsuleTokenId) -> Result<TxHash, TxError> {
        let hash = self.write().await?;
        self.unlocks.lock().unwrap().push((from, token_id));
        Ok(hash)
    }

    async fn confirmation(&self, tx_hash: &TxHash) -> Result<Option<bool>, NodeError> {
        Ok(self.receipts.lock().unwrap().get(tx_hash.as_str()).copied())
    }
}
