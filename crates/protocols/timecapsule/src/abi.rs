//! Capsule contract ABI
//!
//! Only the three entry points the client calls are declared:
//! `deposit(address,uint256) payable`, `unlock(uint256)` and
//! `getAllBeneficiaryCapsules(address)`.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, sol_data, SolCall, SolType};
use capsule_core::{CapsuleTokenId, ProtocolError, UnixSeconds};

use crate::state::OnChainCapsule;

sol! {
    /// Capsule record as returned by `getAllBeneficiaryCapsules`
    struct CapsuleRecord {
        uint256 btcAmount;
        uint256 unlockTimestamp;
        address beneficiary;
        address depositor;
    }

    function deposit(address beneficiary, uint256 unlockTimestamp) external payable;

    function unlock(uint256 tokenId) external;

    function getAllBeneficiaryCapsules(address beneficiary) external view returns (CapsuleRecord[] memory);
}

type CapsuleList = sol_data::Array<CapsuleRecord>;

pub fn encode_deposit(beneficiary: Address, unlock_timestamp: UnixSeconds) -> Vec<u8> {
    depositCall {
        beneficiary,
        unlockTimestamp: U256::from(unlock_timestamp),
    }
    .abi_encode()
}

pub fn encode_unlock(token_id: CapsuleTokenId) -> Vec<u8> {
    unlockCall {
        tokenId: U256::from(token_id),
    }
    .abi_encode()
}

pub fn encode_get_beneficiary_capsules(beneficiary: Address) -> Vec<u8> {
    getAllBeneficiaryCapsulesCall { beneficiary }.abi_encode()
}

/// Decode the `eth_call` output of `getAllBeneficiaryCapsules`
pub fn decode_beneficiary_capsules(data: &[u8]) -> Result<Vec<OnChainCapsule>, ProtocolError> {
    let records = CapsuleList::abi_decode(data).map_err(|e| ProtocolError::DecodeError {
        message: format!("getAllBeneficiaryCapsules: {}", e),
    })?;

    Ok(records
        .into_iter()
        .map(|r| OnChainCapsule {
            btc_amount: r.btcAmount,
            // Out-of-range timestamps can never be reached by the wall clock
            unlock_timestamp: u64::try_from(r.unlockTimestamp).unwrap_or(u64::MAX),
            beneficiary: r.beneficiary,
            depositor: r.depositor,
        })
        .collect())
}

/// Encode a capsule list the way the contract returns it
pub fn encode_beneficiary_capsules(capsules: &[OnChainCapsule]) -> Vec<u8> {
    let records: Vec<CapsuleRecord> = capsules
        .iter()
        .map(|c| CapsuleRecord {
            btcAmount: c.btc_amount,
            unlockTimestamp: U256::from(c.unlock_timestamp),
            beneficiary: c.beneficiary,
            depositor: c.depositor,
        })
        .collect();
    CapsuleList::abi_encode(&records)
}

/// Decode `Error(string)` revert data (hex, with or without `0x`)
pub fn decode_revert_data(data: &str) -> Option<String> {
    let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data)).ok()?;
    alloy_sol_types::decode_revert_reason(&bytes)
}
