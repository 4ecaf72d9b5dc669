//! Beneficiary capsule discovery via the contract's read entry point

use alloy_primitives::Address;
use capsule_core::ProtocolError;

use crate::chain::CapsuleChain;
use crate::state::{Capsule, OnChainCapsule};

/// Fetch all capsules the given account is beneficiary of.
pub async fn fetch_beneficiary_capsules(
    chain: &dyn CapsuleChain,
    beneficiary: Address,
) -> Result<Vec<Capsule>, ProtocolError> {
    let records = chain.beneficiary_capsules(beneficiary).await?;

    tracing::debug!(
        beneficiary = %beneficiary,
        count = records.len(),
        "Fetched beneficiary capsules"
    );

    Ok(assign_token_ids(records))
}

/// Attach token ids to contract records.
///
/// The read entry point returns no identifiers, so ids are the 1-based
/// position in the returned sequence. This only matches the contract's token
/// ids while its enumeration order does; keep the mapping confined here.
pub fn assign_token_ids(records: Vec<OnChainCapsule>) -> Vec<Capsule> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, r)| Capsule {
            token_id: index as u64 + 1,
            depositor: r.depositor,
            beneficiary: r.beneficiary,
            btc_amount: r.btc_amount,
            unlock_timestamp: r.unlock_timestamp,
        })
        .collect()
}
