use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use super::{rpc_error, PubsubTransport, Subscription, SubscriptionRequest};
use crate::error::ClientError;

const SUBSCRIBE_REQUEST_ID: u64 = 1;

/// JSON-RPC pub/sub over WebSocket.
///
/// Every subscription owns its socket. The notification stream reads from
/// that socket directly, so dropping it closes the connection.
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn connectivity(endpoint: &str, message: impl Into<String>) -> ClientError {
    ClientError::Connectivity {
        endpoint: endpoint.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl PubsubTransport for WsTransport {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
        params: Value,
    ) -> Result<Subscription, ClientError> {
        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| connectivity(&self.url, e.to_string()))?;

        let body = request.build_request_json(SUBSCRIBE_REQUEST_ID, params);
        socket
            .send(Message::Text(body.to_string()))
            .await
            .map_err(|e| connectivity(&self.url, e.to_string()))?;

        let id = loop {
            let text = match socket.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(connectivity(&self.url, "socket closed before subscription was acknowledged"))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(connectivity(&self.url, e.to_string())),
            };
            let mut json: Value = serde_json::from_str(&text)
                .map_err(|e| ClientError::unexpected(request.method(), e.to_string()))?;
            if json.get("id").and_then(Value::as_u64) != Some(SUBSCRIBE_REQUEST_ID) {
                continue;
            }
            if let Some(error) = json.get_mut("error").map(Value::take) {
                return Err(rpc_error(error));
            }
            match json.get("result").and_then(Value::as_u64) {
                Some(id) => break id,
                None => {
                    return Err(ClientError::unexpected(
                        request.method(),
                        "subscription id is not an integer",
                    ))
                }
            }
        };
        debug!(method = %request, subscription = id, endpoint = %self.url, "subscribed");

        let notification = request.notification_method();
        let endpoint = self.url.clone();
        let notifications = socket
            .filter_map(move |message| {
                let endpoint = endpoint.clone();
                async move {
                    match message {
                        Ok(Message::Text(text)) => {
                            let mut json: Value = match serde_json::from_str(&text) {
                                Ok(json) => json,
                                Err(e) => {
                                    warn!(error = %e, "ignoring malformed notification");
                                    return None;
                                }
                            };
                            if json.get("method").and_then(Value::as_str) != Some(notification) {
                                return None;
                            }
                            let params = json.get_mut("params")?;
                            if params.get("subscription").and_then(Value::as_u64) != Some(id) {
                                return None;
                            }
                            params.get_mut("result").map(|result| Ok(result.take()))
                        }
                        Ok(Message::Close(_)) => {
                            Some(Err(connectivity(&endpoint, "subscription socket closed")))
                        }
                        Ok(_) => None,
                        Err(e) => Some(Err(connectivity(&endpoint, e.to_string()))),
                    }
                }
            })
            .boxed();

        Ok(Subscription { id, notifications })
    }
}
