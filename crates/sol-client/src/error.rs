use std::time::Duration;

use serde_json::Value;
use sol_tx::{Signature, TxError};
use thiserror::Error;

/// Everything that can go wrong between composing a transaction and seeing
/// it confirmed.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Transport-level failure (unreachable endpoint, dropped socket, HTTP
    /// status). May be retried by the caller with backoff.
    #[error("connectivity error: {message} (endpoint: {endpoint})")]
    Connectivity { endpoint: String, message: String },

    /// A JSON-RPC error object returned by the node.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("unexpected response to {method}: {message}")]
    UnexpectedResponse { method: String, message: String },

    /// The network refused or failed the transaction. Rebuild it with a fresh
    /// blockhash before trying again.
    #[error("transaction rejected: {reason}")]
    Rejected {
        signature: Option<Signature>,
        reason: String,
    },

    /// The blockhash validity window elapsed before the transaction was seen
    /// at the requested commitment. It may still have landed: re-check
    /// account state before assuming either outcome.
    #[error("transaction {signature} expired before reaching the requested commitment")]
    Expired { signature: Signature },

    /// The wait ran out before any outcome was observed. Like `Expired`, the
    /// transaction may have landed.
    #[error("timed out after {waited:?} waiting for {signature}")]
    Timeout {
        signature: Signature,
        waited: Duration,
    },

    #[error("faucet unavailable: {0}")]
    FaucetUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Tx(#[from] TxError),
}

impl ClientError {
    /// Whether repeating the same call may succeed. Errors raised after a
    /// transaction was sent never qualify, since it may have landed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Connectivity { .. })
    }

    pub(crate) fn unexpected(method: &str, message: impl Into<String>) -> Self {
        ClientError::UnexpectedResponse {
            method: method.to_string(),
            message: message.into(),
        }
    }
}
