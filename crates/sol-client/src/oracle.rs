//! Reads that bound a transaction: recent blockhashes, rent thresholds,
//! block height and balances.

use serde_json::json;
use sol_tx::system::MAX_PERMITTED_DATA_LENGTH;
use sol_tx::{Address, Blockhash, LifetimeToken, TxError};
use tracing::debug;

use crate::commitment::Commitment;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::response::{RpcBlockhash, RpcResponse};
use crate::transport::RpcRequest;

impl Connection {
    /// Fetches a fresh blockhash and the last block height at which a
    /// transaction referencing it is still accepted.
    pub async fn latest_lifetime_token(
        &self,
        commitment: Commitment,
    ) -> Result<LifetimeToken, ClientError> {
        let response: RpcResponse<RpcBlockhash> = self
            .send_request(
                RpcRequest::GetLatestBlockhash,
                json!([{ "commitment": commitment }]),
            )
            .await?;
        let blockhash: Blockhash = response.value.blockhash.parse().map_err(|e: TxError| {
            ClientError::unexpected(RpcRequest::GetLatestBlockhash.method(), e.to_string())
        })?;
        debug!(
            %blockhash,
            last_valid_block_height = response.value.last_valid_block_height,
            %commitment,
            "fetched lifetime token"
        );
        Ok(LifetimeToken {
            blockhash,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    /// Lamports an account of `size` data bytes must hold to be rent exempt.
    pub async fn rent_exemption_threshold(&self, size: u64) -> Result<u64, ClientError> {
        if size > MAX_PERMITTED_DATA_LENGTH {
            return Err(TxError::InvalidSize(format!(
                "{size} bytes exceeds the maximum account size of {MAX_PERMITTED_DATA_LENGTH}"
            ))
            .into());
        }
        let lamports: u64 = self
            .send_request(
                RpcRequest::GetMinimumBalanceForRentExemption,
                json!([size, { "commitment": self.commitment() }]),
            )
            .await?;
        debug!(size, lamports, "fetched rent exemption threshold");
        Ok(lamports)
    }

    pub async fn block_height(&self, commitment: Commitment) -> Result<u64, ClientError> {
        self.send_request(
            RpcRequest::GetBlockHeight,
            json!([{ "commitment": commitment }]),
        )
        .await
    }

    pub async fn balance(
        &self,
        address: &Address,
        commitment: Commitment,
    ) -> Result<u64, ClientError> {
        let response: RpcResponse<u64> = self
            .send_request(
                RpcRequest::GetBalance,
                json!([address.to_string(), { "commitment": commitment }]),
            )
            .await?;
        Ok(response.value)
    }
}
