//! WebSocket transport using tokio-tungstenite.

use std::time::Duration;

use async_trait::async_trait;
use futures_channel::mpsc::unbounded;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::transport::{Transport, TransportLink};
use crate::error::TransportError;
use crate::session::Principal;

/// How long a close handshake may take on a socket that has gone quiet.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a fresh WebSocket to `base_url` for every attempt.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    base_url: Url,
}

impl WebSocketTransport {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
        })
    }

    /// The URL for one attempt, with the principal in the query string.
    pub fn url_for(&self, principal: &Principal) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("principal", &principal.id);
            if let Some(token) = &principal.token {
                query.append_pair("token", token);
            }
        }
        url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, principal: &Principal) -> Result<TransportLink, TransportError> {
        let url = self.url_for(principal);
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::info!(host = url.host_str().unwrap_or_default(), "WebSocket connected");

        let (mut write, mut read) = ws_stream.split();
        let (outbound, mut outbound_rx) = unbounded::<String>();
        let (inbound_tx, inbound) = unbounded::<String>();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        // Read task: ends when the socket closes or the writer signals that
        // the link was dropped.
        tokio::spawn(async move {
            loop {
                let msg_result = tokio::select! {
                    _ = &mut stop_rx => {
                        tracing::debug!("link dropped, stopping WebSocket reader");
                        break;
                    }
                    msg = read.next() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                };
                match msg_result {
                    Ok(Message::Text(text)) => {
                        tracing::debug!(frame = %text, "WebSocket received");
                        if inbound_tx.unbounded_send(text.to_string()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::info!(?frame, "WebSocket received close frame");
                        break;
                    }
                    Ok(_) => {
                        // Protocol pings are answered by tungstenite; liveness uses
                        // application-level frames.
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket read error");
                        break;
                    }
                }
            }
        });

        // Write task: ends when the sender is dropped or a send fails.
        tokio::spawn(async move {
            while let Some(json) = outbound_rx.next().await {
                tracing::debug!(frame = %json, "WebSocket sending");
                if let Err(e) = write.send(Message::text(json)).await {
                    tracing::warn!(error = %e, "WebSocket send failed");
                    let _ = stop_tx.send(());
                    return;
                }
            }
            let _ = stop_tx.send(());
            let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await;
        });

        Ok(TransportLink { outbound, inbound })
    }
}
