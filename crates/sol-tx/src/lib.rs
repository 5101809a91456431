//! Offline transaction construction for Solana.
//!
//! This crate composes instructions, compiles them into canonical messages,
//! signs them and encodes the result in the network's wire format. It does
//! no I/O: blockhashes and rent thresholds are passed in by the caller
//! (see the `sol-client` crate).
//!
//! The wire format is implemented by hand on top of `ed25519-dalek` and
//! `bs58`, without `solana-sdk`.

pub mod address;
pub mod amount;
pub mod error;
pub mod instruction;
pub mod keypair;
pub mod message;
pub mod system;
pub mod token;
pub mod transaction;
pub mod wire;

pub use address::{Address, SYSTEM_PROGRAM_ID, SYSVAR_RENT_ID, TOKEN_PROGRAM_ID};
pub use amount::{lamports_to_sol, parse_lamports, sol_to_lamports, LAMPORTS_PER_SOL};
pub use error::TxError;
pub use instruction::{AccountMeta, Instruction};
pub use keypair::{Keypair, NullSigner, Signature, Signer};
pub use message::{
    Blockhash, CompiledInstruction, LifetimeToken, Message, MessageBuilder, MessageHeader,
    MessageVersion,
};
pub use token::{MintParams, DEFAULT_MINT_DECIMALS, MINT_SIZE};
pub use transaction::Transaction;
