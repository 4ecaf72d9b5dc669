//! Capsule transaction builders
//!
//! Three contract interactions:
//! 1. Deposit: create a capsule (payable, value = locked amount)
//! 2. Unlock: release a matured capsule to its beneficiary
//! 3. Query: read-only enumeration of a beneficiary's capsules

use alloy_primitives::{Address, U256};
use capsule_core::time::{parse_unlock_date, resolve_unlock_timestamp};
use capsule_core::{
    parse_account_address, AmountRules, CapsuleTokenId, ProtocolError, UnixSeconds,
    UnlockDatePolicy,
};
use evm_node_client::queries::{contract_call, contract_write};
use evm_node_client::TransactionRequest;
use serde::{Deserialize, Serialize};

use crate::abi;

// =============================================================================
// Creation draft
// =============================================================================

/// Raw creation form input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationDraft {
    /// Beneficiary account (0x + 40 hex)
    pub recipient: String,
    /// Decimal amount in display units
    pub amount: String,
    /// Calendar date, `YYYY-MM-DD`
    pub unlock_date: String,
}

/// Validation settings applied to a draft
#[derive(Debug, Clone)]
pub struct CreationRules {
    pub amounts: AmountRules,
    pub policy: UnlockDatePolicy,
}

/// A validated, chain-ready deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRequest {
    pub beneficiary: Address,
    pub unlock_timestamp: UnixSeconds,
    /// Value attached to the call, in smallest units
    pub value: U256,
}

impl CreationDraft {
    /// Validate every field and resolve the on-chain arguments.
    ///
    /// No network access; a draft that fails here never reaches the chain.
    pub fn validate(
        &self,
        rules: &CreationRules,
        now: UnixSeconds,
    ) -> Result<DepositRequest, ProtocolError> {
        let beneficiary = parse_account_address(self.recipient.trim())?;
        let value = rules.amounts.validate(&self.amount)?;
        let date = parse_unlock_date(&self.unlock_date)?;
        let unlock_timestamp = resolve_unlock_timestamp(rules.policy, date, now)?;

        Ok(DepositRequest {
            beneficiary,
            unlock_timestamp,
            value,
        })
    }
}

// =============================================================================
// Call builders
// =============================================================================

/// `deposit(beneficiary, unlockTimestamp)` with the amount attached as value
pub fn build_deposit_call(
    contract: Address,
    from: Address,
    req: &DepositRequest,
) -> TransactionRequest {
    contract_write(
        contract,
        from,
        abi::encode_deposit(req.beneficiary, req.unlock_timestamp),
        Some(req.value),
    )
}

/// `unlock(tokenId)`
pub fn build_unlock_call(
    contract: Address,
    from: Address,
    token_id: CapsuleTokenId,
) -> TransactionRequest {
    contract_write(contract, from, abi::encode_unlock(token_id), None)
}

/// `getAllBeneficiaryCapsules(beneficiary)`
pub fn build_beneficiary_query(contract: Address, beneficiary: Address) -> TransactionRequest {
    contract_call(contract, abi::encode_get_beneficiary_capsules(beneficiary))
}
