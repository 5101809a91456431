use thiserror::Error;

use crate::address::Address;

/// Errors raised while composing, assembling or signing a transaction.
///
/// None of these ever reach the network: a transaction that fails here is
/// never transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("incomplete signature set, missing: {}", join_addresses(.missing))]
    IncompleteSignature { missing: Vec<Address> },

    #[error("signature for {0} does not verify against the message")]
    InvalidSignature(Address),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(Address::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
