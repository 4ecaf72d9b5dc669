//! Chain access for the capsule flows
//!
//! Reads go to the node endpoint; writes go to the wallet endpoint, which
//! signs and broadcasts `eth_sendTransaction` on behalf of the connected
//! account. Both are alloy providers behind [`RpcClient`].

use std::sync::{Arc, RwLock};

use alloy_primitives::Address;
use async_trait::async_trait;
use capsule_core::{CapsuleTokenId, NodeError, ProtocolError, TxError, TxHash};
use evm_node_client::{queries, RpcClient};

use crate::abi;
use crate::constants::{EXECUTION_REVERTED_CODE, USER_REJECTED_CODE};
use crate::state::OnChainCapsule;
use crate::tx_builder::{self, DepositRequest};

/// Contract operations the flows depend on
#[async_trait]
pub trait CapsuleChain: Send + Sync {
    /// `getAllBeneficiaryCapsules(beneficiary)`
    async fn beneficiary_capsules(
        &self,
        beneficiary: Address,
    ) -> Result<Vec<OnChainCapsule>, ProtocolError>;

    /// Submit `deposit` from `from`; resolves once a hash is returned
    async fn deposit(&self, from: Address, request: &DepositRequest) -> Result<TxHash, TxError>;

    /// Submit `unlock(token_id)` from `from`
    async fn unlock(&self, from: Address, token_id: CapsuleTokenId) -> Result<TxHash, TxError>;

    /// `Some(success)` once mined, `None` while pending
    async fn confirmation(&self, tx_hash: &TxHash) -> Result<Option<bool>, NodeError>;
}

/// Shared handle to the chain the flows talk to.
///
/// Replacing the chain keeps the flows, and with them the in-flight markers.
/// Calls already running finish against the chain they started with.
#[derive(Clone)]
pub struct ChainHandle {
    current: Arc<RwLock<Arc<dyn CapsuleChain>>>,
}

impl ChainHandle {
    pub fn new(chain: Arc<dyn CapsuleChain>) -> Self {
        Self {
            current: Arc::new(RwLock::new(chain)),
        }
    }

    pub fn current(&self) -> Arc<dyn CapsuleChain> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn replace(&self, chain: Arc<dyn CapsuleChain>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = chain;
    }
}

/// Provider-backed implementation
#[derive(Clone)]
pub struct RpcCapsuleChain {
    contract: Address,
    node: RpcClient,
    wallet: RpcClient,
}

impl RpcCapsuleChain {
    pub fn new(contract: Address, node: RpcClient, wallet: RpcClient) -> Self {
        Self {
            contract,
            node,
            wallet,
        }
    }
}

#[async_trait]
impl CapsuleChain for RpcCapsuleChain {
    async fn beneficiary_capsules(
        &self,
        beneficiary: Address,
    ) -> Result<Vec<OnChainCapsule>, ProtocolError> {
        let call = tx_builder::build_beneficiary_query(self.contract, beneficiary);
        let data = self
            .node
            .call(call)
            .await
            .map_err(|e| ProtocolError::StateUnavailable {
                reason: e.to_string(),
            })?;
        abi::decode_beneficiary_capsules(&data)
    }

    async fn deposit(&self, from: Address, request: &DepositRequest) -> Result<TxHash, TxError> {
        let call = tx_builder::build_deposit_call(self.contract, from, request);
        let hash = self
            .wallet
            .send_transaction(call)
            .await
            .map_err(write_failure)?;

        tracing::info!(
            tx_hash = %hash,
            beneficiary = %request.beneficiary,
            unlock_timestamp = request.unlock_timestamp,
            "Deposit submitted"
        );
        Ok(hash)
    }

    async fn unlock(&self, from: Address, token_id: CapsuleTokenId) -> Result<TxHash, TxError> {
        let call = tx_builder::build_unlock_call(self.contract, from, token_id);
        let hash = self
            .wallet
            .send_transaction(call)
            .await
            .map_err(write_failure)?;

        tracing::info!(tx_hash = %hash, token_id, "Unlock submitted");
        Ok(hash)
    }

    async fn confirmation(&self, tx_hash: &TxHash) -> Result<Option<bool>, NodeError> {
        let receipt = self.node.transaction_receipt(tx_hash).await?;
        Ok(receipt.as_ref().map(queries::receipt_succeeded))
    }
}

/// Classify a wallet-endpoint failure
pub fn write_failure(err: NodeError) -> TxError {
    match err {
        NodeError::Rpc { code, message, .. } if code == USER_REJECTED_CODE => {
            TxError::Rejected { message }
        }
        NodeError::Rpc {
            code,
            message,
            data,
        } if code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert") => {
            TxError::Reverted {
                reason: data.as_deref().and_then(abi::decode_revert_data),
                message,
            }
        }
        NodeError::Rpc { message, .. } => TxError::SubmissionFailed { message },
        e @ (NodeError::Unreachable { .. } | NodeError::Timeout { .. } | NodeError::ApiError { .. }) => {
            TxError::Transport {
                message: e.to_string(),
            }
        }
        other => TxError::SubmissionFailed {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{beneficiary, MockChain};
    use alloy_sol_types::{sol_data, SolType};

    fn revert_hex(reason: &str) -> String {
        let mut bytes = vec![0x08, 0xc3, 0x79, 0xa0];
        bytes.extend(sol_data::String::abi_encode(&reason.to_string()));
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn test_user_rejection() {
        let err = write_failure(NodeError::Rpc {
            code: 4001,
            message: "User denied transaction signature".into(),
            data: None,
        });
        assert!(matches!(err, TxError::Rejected { .. }));
        assert_eq!(err.user_message(), "User denied transaction signature");
    }

    #[test]
    fn test_revert_reason_is_decoded() {
        let err = write_failure(NodeError::Rpc {
            code: 3,
            message: "execution reverted: Capsule still locked".into(),
            data: Some(revert_hex("Capsule still locked")),
        });
        assert_eq!(err.error_code(), "tx_reverted");
        assert_eq!(err.user_message(), "Capsule still locked");
    }

    #[test]
    fn test_revert_without_data_uses_message() {
        let err = write_failure(NodeError::Rpc {
            code: -32000,
            message: "Execution Reverted".into(),
            data: None,
        });
        assert_eq!(err.error_code(), "tx_reverted");
        assert_eq!(err.user_message(), "Execution Reverted");
    }

    #[test]
    fn test_transport_and_other_failures() {
        let err = write_failure(NodeError::Timeout { secs: 30 });
        assert_eq!(err.error_code(), "wallet_unavailable");

        let err = write_failure(NodeError::Rpc {
            code: -32000,
            message: "insufficient funds for gas".into(),
            data: None,
        });
        assert_eq!(err.error_code(), "tx_failed");
        assert_eq!(err.user_message(), "insufficient funds for gas");

        let err = write_failure(NodeError::ParseError("bad hash".into()));
        assert_eq!(err.error_code(), "tx_failed");
    }

    #[tokio::test]
    async fn test_replaced_chain_serves_new_calls() {
        let first = Arc::new(MockChain::new());
        let second = Arc::new(MockChain::new());
        let handle = ChainHandle::new(first.clone());

        handle
            .current()
            .beneficiary_capsules(beneficiary())
            .await
            .unwrap();
        handle.replace(second.clone());
        handle
            .current()
            .beneficiary_capsules(beneficiary())
            .await
            .unwrap();

        assert_eq!(first.read_count(), 1);
        assert_eq!(second.read_count(), 1);
    }
}
