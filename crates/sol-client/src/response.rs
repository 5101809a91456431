//! Typed shapes of the JSON-RPC results the pipeline reads.

use serde::Deserialize;
use serde_json::Value;

use crate::commitment::Commitment;

#[derive(Debug, Clone, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

/// Results wrapped in `{ context, value }`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    pub context: RpcContext,
    pub value: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcSignatureStatus {
    pub slot: u64,
    /// `None` once the block is rooted.
    pub confirmations: Option<u64>,
    pub err: Option<Value>,
    pub confirmation_status: Option<Commitment>,
}

impl RpcSignatureStatus {
    /// Commitment reached so far. Nodes that omit `confirmationStatus`
    /// report rooted blocks through `confirmations: null`.
    pub fn commitment(&self) -> Commitment {
        match (self.confirmation_status, self.confirmations) {
            (Some(commitment), _) => commitment,
            (None, None) => Commitment::Finalized,
            (None, Some(_)) => Commitment::Processed,
        }
    }
}

/// Payload of a `signatureNotification`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcSignatureResult {
    pub err: Option<Value>,
}
