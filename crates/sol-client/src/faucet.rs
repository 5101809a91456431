use serde_json::json;
use sol_tx::amount::ensure_positive;
use sol_tx::{Address, Signature};
use tracing::{info, instrument, warn};

use crate::commitment::Commitment;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::submit::SubmitOptions;
use crate::transport::RpcRequest;

/// One SOL, the amount a fresh wallet is funded with.
pub const DEFAULT_AIRDROP_LAMPORTS: u64 = sol_tx::LAMPORTS_PER_SOL;

impl Connection {
    /// Asks the cluster faucet to credit `lamports` to `address` and waits
    /// until the credit reaches `commitment`.
    ///
    /// Each call is a separate airdrop.
    #[instrument(skip(self), fields(%address, lamports, %commitment))]
    pub async fn request_airdrop(
        &self,
        address: &Address,
        lamports: u64,
        commitment: Commitment,
    ) -> Result<Signature, ClientError> {
        ensure_positive(lamports)?;
        let params = json!([address.to_string(), lamports, { "commitment": commitment }]);
        let raw: String = match self.send_request(RpcRequest::RequestAirdrop, params).await {
            Ok(raw) => raw,
            Err(ClientError::Rpc { code, message, .. }) => {
                warn!(code, %message, "airdrop refused");
                return Err(ClientError::FaucetUnavailable(format!("{message} (code {code})")));
            }
            Err(e) => return Err(e),
        };
        let signature: Signature = raw
            .parse()
            .map_err(|e: sol_tx::TxError| ClientError::unexpected(RpcRequest::RequestAirdrop.method(), e.to_string()))?;

        let options = SubmitOptions {
            commitment,
            ..*self.options()
        };
        self.confirm_transaction(&signature, None, &options).await?;
        info!(%signature, "airdrop confirmed");
        Ok(signature)
    }
}
