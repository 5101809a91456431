//! Transmission and confirmation.
//!
//! ```text
//! BUILT -> SENT -> CONFIRMED(commitment) | EXPIRED | REJECTED(reason)
//! ```
//!
//! Confirmation listens on a `signatureSubscribe` stream when a pub/sub
//! transport is configured and polls `getSignatureStatuses` on every tick
//! regardless. The subscription is opened alongside the first poll, so a
//! dropped or stalled socket only costs latency. A failed poll is logged and
//! retried on the next tick. Expiry is detected by comparing the block height
//! with the lifetime token's `last_valid_block_height`.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};
use sol_tx::{LifetimeToken, Signature, Transaction};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::commitment::Commitment;
use crate::config::{ClientConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_SECS};
use crate::connection::Connection;
use crate::error::ClientError;
use crate::response::{RpcResponse, RpcSignatureResult, RpcSignatureStatus};
use crate::transport::{RpcRequest, SubscriptionRequest};

/// Error code of a failed preflight simulation.
pub const SEND_TRANSACTION_PREFLIGHT_FAILURE: i64 = -32002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub commitment: Commitment,
    /// Upper bound on the whole confirmation wait.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub skip_preflight: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            commitment: Commitment::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            skip_preflight: false,
        }
    }
}

impl SubmitOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            commitment: config.commitment,
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            skip_preflight: false,
        }
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = commitment;
        self
    }

    /// Zero durations would never tick or never wait.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.poll_interval.is_zero() {
            return Err(ClientError::Config("poll_interval must be > 0".into()));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::Config("timeout must be > 0".into()));
        }
        Ok(())
    }
}

/// A transaction observed at (at least) the requested commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed {
    pub signature: Signature,
    pub commitment: Commitment,
    pub slot: u64,
}

impl Connection {
    /// Transmits a signed transaction and returns its signature.
    ///
    /// Unsigned or tampered transactions are refused locally.
    #[instrument(skip_all, fields(signature = %tx.signature()))]
    pub async fn send_transaction(
        &self,
        tx: &Transaction,
        options: &SubmitOptions,
    ) -> Result<Signature, ClientError> {
        tx.verify()?;
        let signature = *tx.signature();
        let encoded = BASE64.encode(tx.to_wire_bytes()?);
        let params = json!([
            encoded,
            {
                "encoding": "base64",
                "skipPreflight": options.skip_preflight,
                "preflightCommitment": options.commitment,
            }
        ]);

        match self.send_request::<String>(RpcRequest::SendTransaction, params).await {
            Ok(returned) => {
                if returned != signature.to_string() {
                    warn!(%returned, "node returned a different signature");
                }
                debug!("transaction sent");
                Ok(signature)
            }
            Err(ClientError::Rpc { code, message, data }) => {
                if is_blockhash_not_found(&data) {
                    warn!("blockhash not found during preflight");
                    return Err(ClientError::Expired { signature });
                }
                let reason = rejection_reason(code, &message, data.as_ref());
                warn!(%reason, "transaction rejected");
                Err(ClientError::Rejected {
                    signature: Some(signature),
                    reason,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Waits until `signature` reaches `options.commitment`.
    ///
    /// With a lifetime token the wait ends as [`ClientError::Expired`] once
    /// the block height passes its `last_valid_block_height`. Without one
    /// (airdrops) only the timeout bounds it.
    #[instrument(skip_all, fields(%signature, commitment = %options.commitment))]
    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        lifetime: Option<&LifetimeToken>,
        options: &SubmitOptions,
    ) -> Result<Confirmed, ClientError> {
        options.validate()?;
        match tokio::time::timeout(
            options.timeout,
            self.wait_for_commitment(signature, lifetime, options),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(waited = ?options.timeout, "confirmation timed out");
                Err(ClientError::Timeout {
                    signature: *signature,
                    waited: options.timeout,
                })
            }
        }
    }

    pub async fn send_and_confirm(
        &self,
        tx: &Transaction,
        lifetime: &LifetimeToken,
        options: &SubmitOptions,
    ) -> Result<Confirmed, ClientError> {
        options.validate()?;
        let signature = self.send_transaction(tx, options).await?;
        let confirmed = self
            .confirm_transaction(&signature, Some(lifetime), options)
            .await?;
        info!(%signature, commitment = %confirmed.commitment, slot = confirmed.slot, "transaction confirmed");
        Ok(confirmed)
    }

    async fn wait_for_commitment(
        &self,
        signature: &Signature,
        lifetime: Option<&LifetimeToken>,
        options: &SubmitOptions,
    ) -> Result<Confirmed, ClientError> {
        // Opened lazily by the first `next()`, concurrently with the ticker.
        let notifications = if self.has_pubsub() {
            let params = json!([signature.to_string(), { "commitment": options.commitment }]);
            stream::once(self.subscribe(SubscriptionRequest::Signature, params))
                .flat_map(|subscribed| match subscribed {
                    Ok(subscription) => subscription.notifications,
                    Err(e) => {
                        warn!(error = %e, "signature subscription failed, polling only");
                        stream::pending().boxed()
                    }
                })
                .boxed()
        } else {
            stream::pending().boxed()
        };
        let mut notifications = notifications.fuse();

        let mut ticker = tokio::time::interval(options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(notification) = notifications.next() => {
                    match notification {
                        Ok(value) => {
                            if let Some(outcome) = notification_outcome(signature, value, options.commitment) {
                                return outcome;
                            }
                        }
                        Err(e) => debug!(error = %e, "subscription ended, polling only"),
                    }
                }
                _ = ticker.tick() => {
                    match self.poll_once(signature, lifetime, options.commitment).await {
                        Ok(Some(outcome)) => return outcome,
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "status poll failed, retrying"),
                    }
                }
            }
        }
    }

    /// One status check. The block height is read before the status so a
    /// transaction that lands in between is never reported as expired.
    async fn poll_once(
        &self,
        signature: &Signature,
        lifetime: Option<&LifetimeToken>,
        commitment: Commitment,
    ) -> Result<Option<Result<Confirmed, ClientError>>, ClientError> {
        let block_height = match lifetime {
            Some(_) => Some(self.block_height(commitment).await?),
            None => None,
        };

        let statuses: RpcResponse<Vec<Option<RpcSignatureStatus>>> = self
            .send_request(
                RpcRequest::GetSignatureStatuses,
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;

        if let Some(status) = statuses.value.into_iter().next().flatten() {
            if let Some(err) = status.err {
                return Ok(Some(Err(ClientError::Rejected {
                    signature: Some(*signature),
                    reason: err.to_string(),
                })));
            }
            let reached = status.commitment();
            if reached.satisfies(commitment) {
                return Ok(Some(Ok(Confirmed {
                    signature: *signature,
                    commitment: reached,
                    slot: status.slot,
                })));
            }
            debug!(%reached, "waiting for higher commitment");
        }

        if let (Some(lifetime), Some(height)) = (lifetime, block_height) {
            if height > lifetime.last_valid_block_height {
                warn!(
                    block_height = height,
                    last_valid_block_height = lifetime.last_valid_block_height,
                    "blockhash expired"
                );
                return Ok(Some(Err(ClientError::Expired {
                    signature: *signature,
                })));
            }
        }
        Ok(None)
    }
}

fn notification_outcome(
    signature: &Signature,
    value: Value,
    commitment: Commitment,
) -> Option<Result<Confirmed, ClientError>> {
    let slot = value.pointer("/context/slot").and_then(Value::as_u64).unwrap_or_default();
    let result: RpcSignatureResult = match value.get("value").cloned().map(serde_json::from_value) {
        Some(Ok(result)) => result,
        _ => {
            debug!("ignoring notification without a signature result");
            return None;
        }
    };
    Some(match result.err {
        Some(err) => Err(ClientError::Rejected {
            signature: Some(*signature),
            reason: err.to_string(),
        }),
        None => Ok(Confirmed {
            signature: *signature,
            commitment,
            slot,
        }),
    })
}

fn is_blockhash_not_found(data: &Option<Value>) -> bool {
    data.as_ref()
        .and_then(|d| d.get("err"))
        .and_then(Value::as_str)
        .is_some_and(|err| err == "BlockhashNotFound")
}

fn rejection_reason(code: i64, message: &str, data: Option<&Value>) -> String {
    match data.and_then(|d| d.get("err")).filter(|e| !e.is_null()) {
        Some(err) => format!("{message} (code {code}): {err}"),
        None => format!("{message} (code {code})"),
    }
}
