//! In-memory ledger speaking the subset of JSON-RPC the pipeline uses.
//!
//! It decodes submitted transactions, checks signatures and blockhash
//! validity, executes System transfers and account creation plus token
//! mint initialisation, and reports statuses that climb one commitment level
//! per status query.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};
use sol_client::{
    ClientError, Commitment, Connection, PubsubTransport, RpcRequest, RpcTransport, SubmitOptions,
    Subscription, SubscriptionRequest,
};
use sol_tx::system::SystemInstruction;
use sol_tx::{
    Address, Blockhash, Instruction, LifetimeToken, Signature, Transaction, MINT_SIZE,
    SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};

pub const FEE_PER_SIGNATURE: u64 = 5_000;
pub const BLOCKHASH_VALIDITY: u64 = 150;
const INITIAL_BLOCK_HEIGHT: u64 = 1_000;

/// Rent-exempt minimum under default cluster rent parameters.
pub fn rent_exempt_minimum(space: u64) -> u64 {
    (128 + space) * 3_480 * 2
}

pub fn test_options() -> SubmitOptions {
    SubmitOptions {
        commitment: Commitment::Confirmed,
        timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(10),
        skip_preflight: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintState {
    pub decimals: u8,
    pub mint_authority: Address,
    pub freeze_authority: Option<Address>,
}

#[derive(Debug, Clone, Default)]
pub struct Account {
    pub lamports: u64,
    pub space: u64,
    pub owner: Address,
    pub mint: Option<MintState>,
}

#[derive(Debug, Clone)]
struct Status {
    slot: u64,
    err: Option<Value>,
    commitment: Commitment,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Address, Account>,
    block_height: u64,
    slot: u64,
    blockhashes: HashMap<Blockhash, u64>,
    blockhash_counter: u64,
    airdrop_counter: u64,
    statuses: HashMap<Signature, Status>,
    requests: Vec<&'static str>,
    faucet_disabled: bool,
    drop_transactions: bool,
    failing_status_polls: u32,
}

#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        let state = LedgerState {
            block_height: INITIAL_BLOCK_HEIGHT,
            slot: INITIAL_BLOCK_HEIGHT + 20,
            ..LedgerState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    /// Polling-only connection.
    pub fn connection(&self) -> Connection {
        Connection::with_transports(Arc::new(self.clone()), None, Commitment::Confirmed)
            .with_options(test_options())
    }

    /// Connection that also confirms through `signatureSubscribe`.
    pub fn connection_with_pubsub(&self) -> Connection {
        let ledger = Arc::new(self.clone());
        Connection::with_transports(ledger.clone(), Some(ledger), Commitment::Confirmed)
            .with_options(test_options())
    }

    /// Connection whose pub/sub endpoint accepts the socket but never acks.
    pub fn connection_with_stalled_pubsub(&self) -> Connection {
        Connection::with_transports(
            Arc::new(self.clone()),
            Some(Arc::new(StalledPubsub)),
            Commitment::Confirmed,
        )
        .with_options(test_options())
    }

    pub fn set_balance(&self, address: &Address, lamports: u64) {
        self.lock().accounts.entry(*address).or_default().lamports = lamports;
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.lock()
            .accounts
            .get(address)
            .map(|a| a.lamports)
            .unwrap_or_default()
    }

    pub fn account(&self, address: &Address) -> Option<Account> {
        self.lock().accounts.get(address).cloned()
    }

    pub fn block_height(&self) -> u64 {
        self.lock().block_height
    }

    /// Methods called so far, in order.
    pub fn requests(&self) -> Vec<&'static str> {
        self.lock().requests.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.lock().requests.iter().filter(|m| **m == method).count()
    }

    /// Position of the first call to `method`.
    pub fn position(&self, method: &str) -> Option<usize> {
        self.lock().requests.iter().position(|m| *m == method)
    }

    pub fn disable_faucet(&self) {
        self.lock().faucet_disabled = true;
    }

    /// Accept transactions and airdrops without ever landing them.
    pub fn drop_transactions(&self) {
        self.lock().drop_transactions = true;
    }

    /// Fail the next `polls` status queries with a transport error.
    pub fn fail_status_polls(&self, polls: u32) {
        self.lock().failing_status_polls = polls;
    }

    /// A token the ledger knows but whose window already closed.
    pub fn expired_lifetime(&self) -> LifetimeToken {
        let mut state = self.lock();
        let last_valid_block_height = state.block_height - 1;
        register_blockhash(&mut state, last_valid_block_height)
    }

    /// A token valid for `blocks` more blocks.
    pub fn short_lived_lifetime(&self, blocks: u64) -> LifetimeToken {
        let mut state = self.lock();
        let last_valid_block_height = state.block_height + blocks;
        register_blockhash(&mut state, last_valid_block_height)
    }

    fn handle(&self, request: RpcRequest, params: Value) -> Result<Value, ClientError> {
        let mut state = self.lock();
        state.requests.push(request.method());
        let slot = state.slot;

        match request {
            RpcRequest::GetLatestBlockhash => {
                let last_valid = state.block_height + BLOCKHASH_VALIDITY;
                let token = register_blockhash(&mut state, last_valid);
                Ok(json!({
                    "context": { "slot": slot },
                    "value": {
                        "blockhash": token.blockhash.to_string(),
                        "lastValidBlockHeight": token.last_valid_block_height,
                    }
                }))
            }
            RpcRequest::GetMinimumBalanceForRentExemption => {
                let space = params[0].as_u64().ok_or_else(|| invalid_params("size"))?;
                Ok(json!(rent_exempt_minimum(space)))
            }
            RpcRequest::GetBlockHeight => Ok(json!(state.block_height)),
            RpcRequest::GetBalance => {
                let address = parse_address(&params[0])?;
                let lamports = state
                    .accounts
                    .get(&address)
                    .map(|a| a.lamports)
                    .unwrap_or_default();
                Ok(json!({ "context": { "slot": slot }, "value": lamports }))
            }
            RpcRequest::RequestAirdrop => {
                if state.faucet_disabled {
                    return Err(ClientError::Rpc {
                        code: -32601,
                        message: "Method not found".into(),
                        data: None,
                    });
                }
                let address = parse_address(&params[0])?;
                let lamports = params[1].as_u64().ok_or_else(|| invalid_params("lamports"))?;
                state.airdrop_counter += 1;
                let mut bytes = [0xA1u8; 64];
                bytes[..8].copy_from_slice(&state.airdrop_counter.to_le_bytes());
                let signature = Signature::new(bytes);
                if !state.drop_transactions {
                    state.accounts.entry(address).or_default().lamports += lamports;
                    land(&mut state, signature, None);
                }
                Ok(json!(signature.to_string()))
            }
            RpcRequest::SendTransaction => self.handle_send(&mut state, &params),
            RpcRequest::GetSignatureStatuses => {
                if state.failing_status_polls > 0 {
                    state.failing_status_polls -= 1;
                    return Err(ClientError::Connectivity {
                        endpoint: "mock://ledger".into(),
                        message: "connection reset".into(),
                    });
                }
                let signature: Signature = params[0][0]
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| invalid_params("signature"))?;
                state.block_height += 1;
                state.slot += 1;
                let slot = state.slot;
                let status = state.statuses.get_mut(&signature).map(|status| {
                    let confirmations = match status.commitment {
                        Commitment::Finalized => None,
                        _ => Some(1u64),
                    };
                    let reported = json!({
                        "slot": status.slot,
                        "confirmations": confirmations,
                        "err": status.err,
                        "confirmationStatus": status.commitment,
                    });
                    status.commitment = match status.commitment {
                        Commitment::Processed => Commitment::Confirmed,
                        _ => Commitment::Finalized,
                    };
                    reported
                });
                Ok(json!({ "context": { "slot": slot }, "value": [status] }))
            }
        }
    }

    fn handle_send(&self, state: &mut LedgerState, params: &Value) -> Result<Value, ClientError> {
        let encoded = params[0].as_str().ok_or_else(|| invalid_params("transaction"))?;
        let skip_preflight = params[1]["skipPreflight"].as_bool().unwrap_or(false);
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| invalid_params("base64"))?;
        let tx = Transaction::from_wire_bytes(&bytes).map_err(|_| invalid_params("transaction"))?;
        if tx.verify().is_err() {
            return Err(ClientError::Rpc {
                code: -32003,
                message: "Transaction signature verification failure".into(),
                data: None,
            });
        }
        let signature = *tx.signature();

        let blockhash_valid = state
            .blockhashes
            .get(tx.message().recent_blockhash())
            .is_some_and(|last_valid| state.block_height <= *last_valid);
        if !blockhash_valid {
            if skip_preflight {
                return Ok(json!(signature.to_string()));
            }
            return Err(simulation_failure(json!("BlockhashNotFound")));
        }
        if state.drop_transactions {
            return Ok(json!(signature.to_string()));
        }

        let mut accounts = state.accounts.clone();
        match execute(&mut accounts, &tx) {
            Ok(()) => {
                state.accounts = accounts;
                land(state, signature, None);
            }
            Err(err) if skip_preflight => {
                charge_fee(&mut state.accounts, &tx);
                land(state, signature, Some(err));
            }
            Err(err) => return Err(simulation_failure(err)),
        }
        Ok(json!(signature.to_string()))
    }
}

#[async_trait]
impl RpcTransport for MockLedger {
    async fn send(&self, request: RpcRequest, params: Value) -> Result<Value, ClientError> {
        self.handle(request, params)
    }

    fn url(&self) -> String {
        "mock://ledger".into()
    }
}

#[async_trait]
impl PubsubTransport for MockLedger {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
        params: Value,
    ) -> Result<Subscription, ClientError> {
        self.lock().requests.push(request.method());
        let signature: Signature = params[0]
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| invalid_params("signature"))?;

        let state = self.state.clone();
        let notifications = stream::unfold(state, move |state| async move {
            loop {
                let notification = {
                    let state = state.lock().unwrap();
                    state.statuses.get(&signature).map(|status| {
                        json!({
                            "context": { "slot": status.slot },
                            "value": { "err": status.err },
                        })
                    })
                };
                if let Some(notification) = notification {
                    return Some((Ok(notification), state));
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .take(1)
        .boxed();

        Ok(Subscription {
            id: 1,
            notifications,
        })
    }
}

pub struct StalledPubsub;

#[async_trait]
impl PubsubTransport for StalledPubsub {
    async fn subscribe(
        &self,
        _request: SubscriptionRequest,
        _params: Value,
    ) -> Result<Subscription, ClientError> {
        std::future::pending().await
    }
}

fn register_blockhash(state: &mut LedgerState, last_valid_block_height: u64) -> LifetimeToken {
    state.blockhash_counter += 1;
    let mut bytes = [0x5Bu8; 32];
    bytes[..8].copy_from_slice(&state.blockhash_counter.to_le_bytes());
    let blockhash = Blockhash::new(bytes);
    state.blockhashes.insert(blockhash, last_valid_block_height);
    LifetimeToken {
        blockhash,
        last_valid_block_height,
    }
}

fn land(state: &mut LedgerState, signature: Signature, err: Option<Value>) {
    let slot = state.slot;
    state.statuses.insert(
        signature,
        Status {
            slot,
            err,
            commitment: Commitment::Processed,
        },
    );
}

fn invalid_params(what: &str) -> ClientError {
    ClientError::Rpc {
        code: -32602,
        message: format!("Invalid params: {what}"),
        data: None,
    }
}

fn simulation_failure(err: Value) -> ClientError {
    ClientError::Rpc {
        code: -32002,
        message: "Transaction simulation failed".into(),
        data: Some(json!({ "err": err, "logs": [] })),
    }
}

fn parse_address(value: &Value) -> Result<Address, ClientError> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_params("address"))
}

fn charge_fee(accounts: &mut HashMap<Address, Account>, tx: &Transaction) -> bool {
    let fee = FEE_PER_SIGNATURE * tx.signatures().len() as u64;
    debit(accounts, tx.message().fee_payer(), fee).is_ok()
}

fn execute(accounts: &mut HashMap<Address, Account>, tx: &Transaction) -> Result<(), Value> {
    if !charge_fee(accounts, tx) {
        return Err(json!("InsufficientFundsForFee"));
    }
    for (index, instruction) in tx.message().decompile().iter().enumerate() {
        execute_instruction(accounts, instruction)
            .map_err(|err| json!({ "InstructionError": [index, err] }))?;
    }
    Ok(())
}

fn execute_instruction(
    accounts: &mut HashMap<Address, Account>,
    instruction: &Instruction,
) -> Result<(), Value> {
    let metas = &instruction.accounts;
    if instruction.program_id == SYSTEM_PROGRAM_ID {
        let decoded =
            SystemInstruction::decode(&instruction.data).map_err(|_| json!("InvalidInstructionData"))?;
        match decoded {
            SystemInstruction::Transfer { lamports } => {
                let (from, to) = (&metas[0], &metas[1]);
                if !from.is_signer {
                    return Err(json!("MissingRequiredSignature"));
                }
                debit(accounts, &from.address, lamports).map_err(|_| json!({ "Custom": 1 }))?;
                accounts.entry(to.address).or_default().lamports += lamports;
            }
            SystemInstruction::CreateAccount {
                lamports,
                space,
                owner,
            } => {
                let (payer, new) = (&metas[0], &metas[1]);
                if !payer.is_signer || !new.is_signer {
                    return Err(json!("MissingRequiredSignature"));
                }
                if accounts
                    .get(&new.address)
                    .is_some_and(|a| a.lamports > 0 || a.space > 0)
                {
                    return Err(json!({ "Custom": 0 }));
                }
                debit(accounts, &payer.address, lamports).map_err(|_| json!({ "Custom": 1 }))?;
                accounts.insert(
                    new.address,
                    Account {
                        lamports,
                        space,
                        owner,
                        mint: None,
                    },
                );
            }
        }
        Ok(())
    } else if instruction.program_id == TOKEN_PROGRAM_ID {
        let data = &instruction.data;
        if data.first() != Some(&0) || data.len() < 35 {
            return Err(json!("InvalidInstructionData"));
        }
        let mint = accounts
            .get_mut(&metas[0].address)
            .ok_or_else(|| json!("UninitializedAccount"))?;
        if mint.owner != TOKEN_PROGRAM_ID || mint.space != MINT_SIZE {
            return Err(json!("InvalidAccountData"));
        }
        if mint.lamports < rent_exempt_minimum(mint.space) {
            return Err(json!({ "Custom": 0 }));
        }
        if mint.mint.is_some() {
            return Err(json!({ "Custom": 6 }));
        }
        let freeze_authority = match data[34] {
            0 => None,
            1 if data.len() == 67 => Some(
                Address::try_from_slice(&data[35..67]).map_err(|_| json!("InvalidInstructionData"))?,
            ),
            _ => return Err(json!("InvalidInstructionData")),
        };
        mint.mint = Some(MintState {
            decimals: data[1],
            mint_authority: Address::try_from_slice(&data[2..34])
                .map_err(|_| json!("InvalidInstructionData"))?,
            freeze_authority,
        });
        Ok(())
    } else {
        Err(json!("UnsupportedProgramId"))
    }
}

fn debit(accounts: &mut HashMap<Address, Account>, address: &Address, lamports: u64) -> Result<(), ()> {
    let account = accounts.get_mut(address).ok_or(())?;
    account.lamports = account.lamports.checked_sub(lamports).ok_or(())?;
    Ok(())
}
