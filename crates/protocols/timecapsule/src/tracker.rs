//! Per-capsule unlock state container
//!
//! Keyed by token id, this holds the `isUnlocking` flag and last transaction
//! hash of every unlock attempt. Status derivation and transition guards live
//! here so the state machine can be exercised without the chain.

use std::collections::HashMap;

use capsule_core::{CapsuleTokenId, ProtocolError, TxHash, UnixSeconds};

use crate::state::CapsuleStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockEntry {
    pub unlocking: bool,
    pub last_tx_hash: Option<TxHash>,
}

#[derive(Debug, Default)]
pub struct UnlockTracker {
    entries: HashMap<CapsuleTokenId, UnlockEntry>,
}

impl UnlockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, token_id: CapsuleTokenId) -> Option<&UnlockEntry> {
        self.entries.get(&token_id)
    }

    pub fn is_unlocking(&self, token_id: CapsuleTokenId) -> bool {
        self.entries.get(&token_id).is_some_and(|e| e.unlocking)
    }

    /// Derive the client-observed status of a capsule
    pub fn status(
        &self,
        token_id: CapsuleTokenId,
        unlock_timestamp: UnixSeconds,
        now: UnixSeconds,
    ) -> CapsuleStatus {
        match self.entries.get(&token_id) {
            Some(e) if e.unlocking => CapsuleStatus::Unlocking,
            Some(e) if e.last_tx_hash.is_some() => CapsuleStatus::UnlockSubmitted,
            _ if capsule_core::time::is_unlockable(unlock_timestamp, now) => CapsuleStatus::Ready,
            _ => CapsuleStatus::Locked,
        }
    }

    /// `Ready -> Unlocking`, guarded by the click-time eligibility check
    pub fn begin(
        &mut self,
        token_id: CapsuleTokenId,
        unlock_timestamp: UnixSeconds,
        now: UnixSeconds,
    ) -> Result<(), ProtocolError> {
        match self.status(token_id, unlock_timestamp, now) {
            CapsuleStatus::Ready => {
                self.entries.entry(token_id).or_default().unlocking = true;
                Ok(())
            }
            CapsuleStatus::Locked => Err(ProtocolError::NotYetUnlockable {
                token_id,
                unlock_timestamp,
            }),
            CapsuleStatus::Unlocking => Err(ProtocolError::AlreadyUnlocking { token_id }),
            CapsuleStatus::UnlockSubmitted => Err(ProtocolError::AlreadySubmitted { token_id }),
        }
    }

    /// `Unlocking -> UnlockSubmitted`
    pub fn complete(&mut self, token_id: CapsuleTokenId, tx_hash: TxHash) {
        let entry = self.entries.entry(token_id).or_default();
        entry.unlocking = false;
        entry.last_tx_hash = Some(tx_hash);
    }

    /// `Unlocking -> Ready`; no hash is recorded
    pub fn fail(&mut self, token_id: CapsuleTokenId) {
        let untouched = match self.entries.get_mut(&token_id) {
            Some(entry) => {
                entry.unlocking = false;
                entry.last_tx_hash.is_none()
            }
            None => false,
        };
        if untouched {
            self.entries.remove(&token_id);
        }
    }

    /// Leave `UnlockSubmitted` after the list has been re-read.
    ///
    /// Only the entry still carrying `tx_hash` is cleared.
    pub fn settle(&mut self, token_id: CapsuleTokenId, tx_hash: &TxHash) -> bool {
        let matches = self
            .entries
            .get(&token_id)
            .is_some_and(|e| !e.unlocking && e.last_tx_hash.as_ref() == Some(tx_hash));
        if matches {
            self.entries.remove(&token_id);
        }
        matches
    }

    /// Entries in `UnlockSubmitted`, with the hash each one carries
    pub fn submitted(&self) -> Vec<(CapsuleTokenId, TxHash)> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.unlocking)
            .filter_map(|(id, e)| e.last_tx_hash.clone().map(|hash| (*id, hash)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
