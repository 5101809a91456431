use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::commitment::Commitment;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::submit::SubmitOptions;
use crate::transport::{
    HttpTransport, PubsubTransport, RpcRequest, RpcTransport, Subscription, SubscriptionRequest,
    WsTransport,
};

/// Handle to a single node: a request channel plus an optional
/// subscription channel.
///
/// Cheap to clone and safe to share between tasks. It holds no per-call
/// state.
#[derive(Clone)]
pub struct Connection {
    rpc: Arc<dyn RpcTransport>,
    pubsub: Option<Arc<dyn PubsubTransport>>,
    options: SubmitOptions,
}

impl Connection {
    /// Builds HTTP and WebSocket transports for the configured endpoints.
    /// Nothing is contacted until the first request.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let rpc = HttpTransport::new_with_timeout(&config.rpc_url, config.request_timeout())?;
        let pubsub = WsTransport::new(config.websocket_url()?);
        debug!(endpoint = %config.rpc_url, commitment = %config.commitment, "connection configured");
        Ok(Self {
            rpc: Arc::new(rpc),
            pubsub: Some(Arc::new(pubsub)),
            options: SubmitOptions::from_config(config),
        })
    }

    pub fn with_transports(
        rpc: Arc<dyn RpcTransport>,
        pubsub: Option<Arc<dyn PubsubTransport>>,
        commitment: Commitment,
    ) -> Self {
        Self {
            rpc,
            pubsub,
            options: SubmitOptions {
                commitment,
                ..SubmitOptions::default()
            },
        }
    }

    /// Replaces the defaults used when no explicit options are passed.
    pub fn with_options(mut self, options: SubmitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn commitment(&self) -> Commitment {
        self.options.commitment
    }

    pub fn options(&self) -> &SubmitOptions {
        &self.options
    }

    pub fn url(&self) -> String {
        self.rpc.url()
    }

    pub fn has_pubsub(&self) -> bool {
        self.pubsub.is_some()
    }

    pub async fn send_request<T: DeserializeOwned>(
        &self,
        request: RpcRequest,
        params: Value,
    ) -> Result<T, ClientError> {
        let value = self.rpc.send(request, params).await?;
        serde_json::from_value(value).map_err(|e| ClientError::unexpected(request.method(), e.to_string()))
    }

    pub async fn subscribe(
        &self,
        request: SubscriptionRequest,
        params: Value,
    ) -> Result<Subscription, ClientError> {
        match &self.pubsub {
            Some(pubsub) => pubsub.subscribe(request, params).await,
            None => Err(ClientError::Config(format!(
                "{request} requires a pub/sub endpoint"
            ))),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.rpc.url())
            .field("pubsub", &self.pubsub.is_some())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cluster;
    use serde_json::json;

    #[test]
    fn new_does_not_contact_the_node() {
        let conn = Connection::new(&ClientConfig::for_cluster(Cluster::Localnet)).unwrap();
        assert_eq!(conn.url(), "http://127.0.0.1:8899");
        assert!(conn.has_pubsub());
        assert_eq!(conn.commitment(), Commitment::Confirmed);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = Connection::new(&ClientConfig::with_rpc_url("not a url")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[tokio::test]
    async fn subscribe_without_pubsub_is_config_error() {
        let rpc = Arc::new(HttpTransport::new("http://127.0.0.1:8899").unwrap());
        let conn = Connection::with_transports(rpc, None, Commitment::Finalized);
        assert_eq!(conn.commitment(), Commitment::Finalized);
        let err = conn
            .subscribe(SubscriptionRequest::Signature, json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
