use std::sync::Arc;

use futures_util::future::try_join_all;
use sol_tx::{Address, Keypair, MintParams, Signature};
use tracing::info;

use crate::connection::Connection;
use crate::error::ClientError;
use crate::faucet::DEFAULT_AIRDROP_LAMPORTS;
use crate::ops;
use crate::submit::Confirmed;

/// A connection plus the wallet that pays for and signs operations.
#[derive(Clone)]
pub struct Client {
    connection: Connection,
    wallet: Arc<Keypair>,
}

/// Result of [`Client::create_mint`].
#[derive(Debug)]
pub struct CreatedMint {
    pub mint: Keypair,
    pub confirmed: Confirmed,
}

impl CreatedMint {
    pub fn address(&self) -> Address {
        self.mint.address()
    }
}

impl Client {
    pub fn new(connection: Connection, wallet: Keypair) -> Self {
        Self {
            connection,
            wallet: Arc::new(wallet),
        }
    }

    /// Generates a wallet and funds it from the faucet with one SOL.
    pub async fn with_funded_wallet(connection: Connection) -> Result<Self, ClientError> {
        let wallet = Keypair::generate();
        info!(wallet = %wallet.address(), "generated wallet");
        connection
            .request_airdrop(&wallet.address(), DEFAULT_AIRDROP_LAMPORTS, connection.commitment())
            .await?;
        Ok(Self::new(connection, wallet))
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn wallet(&self) -> &Keypair {
        &self.wallet
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub async fn balance(&self, address: &Address) -> Result<u64, ClientError> {
        self.connection
            .balance(address, self.connection.commitment())
            .await
    }

    /// Balances of several accounts, queried concurrently.
    pub async fn balances(&self, addresses: &[Address]) -> Result<Vec<u64>, ClientError> {
        try_join_all(addresses.iter().map(|address| self.balance(address))).await
    }

    /// Airdrops to `to`, or to the wallet when `to` is `None`.
    pub async fn airdrop(&self, to: Option<&Address>, lamports: u64) -> Result<Signature, ClientError> {
        let to = to.copied().unwrap_or_else(|| self.address());
        self.connection
            .request_airdrop(&to, lamports, self.connection.commitment())
            .await
    }

    pub async fn send_sol(&self, to: &Address, lamports: u64) -> Result<Confirmed, ClientError> {
        ops::transfer(
            &self.connection,
            self.wallet.as_ref(),
            to,
            lamports,
            self.connection.options(),
        )
        .await
    }

    /// Creates a mint with a fresh address and the wallet as mint authority.
    /// The wallet is also the freeze authority unless `freeze_authority` is
    /// false.
    pub async fn create_mint(
        &self,
        decimals: Option<u8>,
        freeze_authority: bool,
    ) -> Result<CreatedMint, ClientError> {
        let mint = Keypair::generate();
        let mut params = MintParams::new(self.address());
        if let Some(decimals) = decimals {
            params.decimals = decimals;
        }
        if !freeze_authority {
            params.freeze_authority = None;
        }
        let confirmed = ops::create_mint(
            &self.connection,
            self.wallet.as_ref(),
            &mint,
            &params,
            self.connection.options(),
        )
        .await?;
        info!(mint = %mint.address(), signature = %confirmed.signature, "mint created");
        Ok(CreatedMint { mint, confirmed })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("connection", &self.connection)
            .field("wallet", &self.wallet.address())
            .finish()
    }
}
