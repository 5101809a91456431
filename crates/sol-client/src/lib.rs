//! Networked half of the transaction pipeline.
//!
//! [`Connection`] wraps the node endpoints. On top of it sit the lifetime
//! reads (`oracle`), transmission and confirmation (`submit`), faucet
//! funding (`faucet`) and the composed operations in [`ops`]. [`Client`]
//! pairs a connection with a paying wallet.

pub mod client;
pub mod commitment;
pub mod config;
pub mod connection;
pub mod error;
pub mod faucet;
pub mod oracle;
pub mod ops;
pub mod response;
pub mod submit;
pub mod transport;

pub use client::{Client, CreatedMint};
pub use commitment::Commitment;
pub use config::{ClientConfig, Cluster};
pub use connection::Connection;
pub use error::ClientError;
pub use faucet::DEFAULT_AIRDROP_LAMPORTS;
pub use submit::{Confirmed, SubmitOptions};
pub use transport::{
    HttpTransport, PubsubTransport, RpcRequest, RpcTransport, Subscription, SubscriptionRequest,
    WsTransport,
};
