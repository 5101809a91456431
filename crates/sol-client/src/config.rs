//! Endpoint configuration.
//!
//! A [`ClientConfig`] is either built from a [`Cluster`] preset or loaded
//! from a TOML file:
//!
//! ```toml
//! rpc_url = "https://api.devnet.solana.com"
//! commitment = "confirmed"
//! timeout_secs = 90
//! poll_interval_ms = 500
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::error::ClientError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Well-known clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cluster {
    #[default]
    Localnet,
    Devnet,
    Testnet,
    MainnetBeta,
}

impl Cluster {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::Localnet => "http://127.0.0.1:8899",
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }

    pub fn ws_url(&self) -> &'static str {
        match self {
            Cluster::Localnet => "ws://127.0.0.1:8900",
            Cluster::Devnet => "wss://api.devnet.solana.com",
            Cluster::Testnet => "wss://api.testnet.solana.com",
            Cluster::MainnetBeta => "wss://api.mainnet-beta.solana.com",
        }
    }

    /// Mainnet has no faucet.
    pub fn has_faucet(&self) -> bool {
        !matches!(self, Cluster::MainnetBeta)
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cluster::Localnet => "localnet",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::MainnetBeta => "mainnet-beta",
        };
        f.write_str(name)
    }
}

impl FromStr for Cluster {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet-beta" | "mainnet" => Ok(Cluster::MainnetBeta),
            other => Err(ClientError::Config(format!("unknown cluster {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub rpc_url: String,
    /// Derived from `rpc_url` when absent.
    #[serde(default)]
    pub ws_url: Option<String>,
    #[serde(default)]
    pub commitment: Commitment,
    /// Upper bound on a whole confirmation wait.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on a single HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_cluster(Cluster::default())
    }
}

impl ClientConfig {
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self {
            rpc_url: cluster.rpc_url().to_string(),
            ws_url: Some(cluster.ws_url().to_string()),
            commitment: Commitment::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Config for a custom RPC URL; the WebSocket URL is derived.
    pub fn with_rpc_url(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ws_url: None,
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ClientError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ClientError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        parse_url(&self.rpc_url, &["http", "https"])?;
        self.websocket_url()?;
        if self.poll_interval_ms == 0 {
            return Err(ClientError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config("request_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// The pub/sub endpoint: `ws_url` if set, otherwise `rpc_url` with the
    /// scheme switched to `ws`/`wss` and an explicit port bumped by one.
    pub fn websocket_url(&self) -> Result<String, ClientError> {
        if let Some(ws_url) = &self.ws_url {
            parse_url(ws_url, &["ws", "wss"])?;
            return Ok(ws_url.clone());
        }

        let mut url = parse_url(&self.rpc_url, &["http", "https"])?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::Config(format!("cannot derive ws url from {}", self.rpc_url)))?;
        if let Some(port) = url.port() {
            let bumped = port.checked_add(1).ok_or_else(|| {
                ClientError::Config(format!("cannot derive ws port from {}", self.rpc_url))
            })?;
            url.set_port(Some(bumped))
                .map_err(|_| ClientError::Config(format!("cannot set ws port on {url}")))?;
        }
        Ok(url.to_string().trim_end_matches('/').to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_url(raw: &str, schemes: &[&str]) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::Config(format!("invalid url {raw:?}: {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(ClientError::Config(format!(
            "url {raw:?} must use one of {schemes:?}"
        )));
    }
    Ok(url)
}
