//! Request/response and push-notification channels to a node.
//!
//! [`RpcTransport`] and [`PubsubTransport`] are the seams the rest of the
//! crate talks through. The network implementations are [`HttpTransport`]
//! and [`WsTransport`]; tests substitute an in-memory ledger.

mod http;
mod ws;

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::{json, Value};

use crate::error::ClientError;

pub use http::HttpTransport;
pub use ws::WsTransport;

/// JSON-RPC methods the pipeline calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcRequest {
    GetBalance,
    GetBlockHeight,
    GetLatestBlockhash,
    GetMinimumBalanceForRentExemption,
    GetSignatureStatuses,
    RequestAirdrop,
    SendTransaction,
}

impl RpcRequest {
    pub fn method(&self) -> &'static str {
        match self {
            RpcRequest::GetBalance => "getBalance",
            RpcRequest::GetBlockHeight => "getBlockHeight",
            RpcRequest::GetLatestBlockhash => "getLatestBlockhash",
            RpcRequest::GetMinimumBalanceForRentExemption => "getMinimumBalanceForRentExemption",
            RpcRequest::GetSignatureStatuses => "getSignatureStatuses",
            RpcRequest::RequestAirdrop => "requestAirdrop",
            RpcRequest::SendTransaction => "sendTransaction",
        }
    }

    pub fn build_request_json(&self, id: u64, params: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": self.method(),
            "params": params,
        })
    }
}

impl fmt::Display for RpcRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Pub/sub subscriptions the pipeline opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionRequest {
    Signature,
}

impl SubscriptionRequest {
    pub fn method(&self) -> &'static str {
        match self {
            SubscriptionRequest::Signature => "signatureSubscribe",
        }
    }

    /// Method name carried by notifications for this subscription.
    pub fn notification_method(&self) -> &'static str {
        match self {
            SubscriptionRequest::Signature => "signatureNotification",
        }
    }

    pub fn build_request_json(&self, id: u64, params: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": self.method(),
            "params": params,
        })
    }
}

impl fmt::Display for SubscriptionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Notifications of one live subscription.
///
/// Each item is the `params.result` payload of a notification. Dropping the
/// subscription releases the underlying channel.
pub struct Subscription {
    pub id: u64,
    pub notifications: BoxStream<'static, Result<Value, ClientError>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}

#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Performs one request and returns its `result` member.
    async fn send(&self, request: RpcRequest, params: Value) -> Result<Value, ClientError>;

    /// Endpoint used in error reports and logs.
    fn url(&self) -> String;
}

#[async_trait]
pub trait PubsubTransport: Send + Sync {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
        params: Value,
    ) -> Result<Subscription, ClientError>;
}

/// Maps a JSON-RPC response envelope to its `result`, or to
/// [`ClientError::Rpc`] when it carries an `error` object.
pub(crate) fn parse_response(method: &str, mut response: Value) -> Result<Value, ClientError> {
    if let Some(error) = response.get_mut("error").map(Value::take) {
        if !error.is_null() {
            return Err(rpc_error(error));
        }
    }
    match response.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(ClientError::unexpected(method, "response has neither result nor error")),
    }
}

pub(crate) fn rpc_error(mut error: Value) -> ClientError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let data = error.get_mut("data").map(Value::take).filter(|d| !d.is_null());
    ClientError::Rpc { code, message, data }
}
