//! Request builders and result helpers for the provider calls

use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, U256};
use alloy::rpc::types::{SyncStatus, TransactionReceipt, TransactionRequest};
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use capsule_core::NodeError;

/// Read-only call of `data` against `to`
pub fn contract_call(to: Address, data: Vec<u8>) -> TransactionRequest {
    TransactionRequest::default().with_to(to).with_input(data)
}

/// Contract write sent from `from`, with optional attached value
pub fn contract_write(
    to: Address,
    from: Address,
    data: Vec<u8>,
    value: Option<U256>,
) -> TransactionRequest {
    let tx = contract_call(to, data).with_from(from);
    match value {
        Some(value) => tx.with_value(value),
        None => tx,
    }
}

/// Highest block known to a syncing node, `None` once synced
pub fn highest_block(status: &SyncStatus) -> Option<u64> {
    match status {
        SyncStatus::Info(info) => u64::try_from(info.highest_block).ok(),
        SyncStatus::None => None,
    }
}

pub fn receipt_succeeded(receipt: &TransactionReceipt) -> bool {
    ReceiptResponse::status(receipt)
}

/// Classify a provider failure
pub fn node_error(err: TransportError, url: &str) -> NodeError {
    match err {
        RpcError::ErrorResp(payload) => NodeError::Rpc {
            code: payload.code,
            message: payload.message.to_string(),
            data: payload.data.as_ref().map(|raw| error_data(raw.get())),
        },
        RpcError::Transport(kind @ TransportErrorKind::HttpError(_)) => NodeError::ApiError {
            message: kind.to_string(),
        },
        RpcError::Transport(kind) => {
            tracing::debug!(url, error = %kind, "Transport failure");
            NodeError::Unreachable {
                url: url.to_string(),
            }
        }
        RpcError::NullResp => NodeError::ParseError("empty response".into()),
        RpcError::DeserError { err, .. } => NodeError::ParseError(err.to_string()),
        other => NodeError::ApiError {
            message: other.to_string(),
        },
    }
}

/// `data` member of an error response; JSON strings are unquoted
fn error_data(raw: &str) -> String {
    serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::TxKind;
    use alloy::rpc::json_rpc::ErrorPayload;
    use std::str::FromStr;

    #[test]
    fn test_contract_write_fields() {
        let to = Address::from_str("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap();
        let from = Address::from_str("0x1234000000000000000000000000000000abcdef").unwrap();
        let tx = contract_write(to, from, vec![0xde, 0xad], Some(U256::from(16u8)));

        assert_eq!(tx.to, Some(TxKind::Call(to)));
        assert_eq!(tx.from, Some(from));
        assert_eq!(tx.value, Some(U256::from(16u8)));
        assert_eq!(tx.input.input().unwrap().to_vec(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_contract_call_omits_sender_and_value() {
        let tx = contract_call(Address::ZERO, vec![]);
        assert!(tx.from.is_none());
        assert!(tx.value.is_none());
    }

    #[test]
    fn test_highest_block() {
        let idle: SyncStatus = serde_json::from_value(serde_json::json!(false)).unwrap();
        assert_eq!(highest_block(&idle), None);

        let syncing: SyncStatus = serde_json::from_value(serde_json::json!({
            "startingBlock": "0x0",
            "currentBlock": "0x64",
            "highestBlock": "0xc8"
        }))
        .unwrap();
        assert_eq!(highest_block(&syncing), Some(200));
    }

    #[test]
    fn test_error_response_keeps_code_and_data() {
        let payload: ErrorPayload = serde_json::from_str(
            r#"{"code": 3, "message": "execution reverted", "data": "0x08c379a0"}"#,
        )
        .unwrap();
        match node_error(RpcError::ErrorResp(payload), "http://node") {
            NodeError::Rpc {
                code,
                message,
                data,
            } => {
                assert_eq!(code, 3);
                assert_eq!(message, "execution reverted");
                assert_eq!(data.as_deref(), Some("0x08c379a0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transport_failures() {
        let err = node_error(
            TransportErrorKind::custom_str("connection refused"),
            "http://node",
        );
        assert!(matches!(err, NodeError::Unreachable { url } if url == "http://node"));

        let err = node_error(RpcError::NullResp, "http://node");
        assert!(matches!(err, NodeError::ParseError(_)));
    }

    #[test]
    fn test_error_data_unquotes_strings() {
        assert_eq!(error_data("\"0xdead\""), "0xdead");
        assert_eq!(error_data("{\"k\":1}"), "{\"k\":1}");
    }
}
