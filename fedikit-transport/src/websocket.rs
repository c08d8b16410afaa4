//! WebSocket connector backed by tokio-tungstenite.
//!
//! A [`WsConnection`] is a pair of channels pumped by two spawned tasks,
//! one per direction. The multiplexer in `fedikit-client` owns the
//! channels; tests construct connections from raw channel halves instead of
//! a live socket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tracing::{debug, trace};
use tungstenite::client::IntoClientRequest;
use tungstenite::protocol::Message as WsMessage;
use url::Url;

use fedikit_core::{Error, Result};

use crate::config::ClientConfig;

/// Outbound traffic on a streaming connection.
#[derive(Debug, Clone, PartialEq)]
pub enum WsOutbound {
    Text(String),
    Close,
}

/// One live socket: a sender for control frames and a receiver of inbound
/// text frames. A socket failure surfaces as a terminal `Err` item on the
/// receiver; a clean close simply ends the stream.
#[derive(Debug)]
pub struct WsConnection {
    tx: mpsc::UnboundedSender<WsOutbound>,
    rx: mpsc::UnboundedReceiver<Result<String>>,
}

impl WsConnection {
    /// Assemble a connection from raw channel halves. Used by connectors
    /// and by tests that fake the socket.
    pub fn from_parts(
        tx: mpsc::UnboundedSender<WsOutbound>,
        rx: mpsc::UnboundedReceiver<Result<String>>,
    ) -> Self {
        Self { tx, rx }
    }

    /// Queue a text frame for sending.
    pub fn send(&self, text: String) -> Result<()> {
        self.tx
            .send(WsOutbound::Text(text))
            .map_err(|_| Error::Transport("connection closed".to_string()))
    }

    /// Request a clean close of the underlying socket.
    pub fn close(&self) {
        let _ = self.tx.send(WsOutbound::Close);
    }

    /// Receive the next inbound frame. `None` means the connection ended.
    pub async fn recv(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }

    /// Split into the outbound sender and inbound receiver, for callers
    /// that pump the two directions from different tasks.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<WsOutbound>,
        mpsc::UnboundedReceiver<Result<String>>,
    ) {
        (self.tx, self.rx)
    }
}

/// Something that can open streaming connections. The production
/// implementation dials the instance's streaming endpoint; tests provide
/// fakes over in-memory channels.
#[async_trait]
pub trait StreamingConnector: Send + Sync {
    async fn connect(&self) -> Result<WsConnection>;
}

/// Connector for the instance's streaming API endpoint.
pub struct TungsteniteConnector {
    config: ClientConfig,
    path: String,
}

impl TungsteniteConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            path: "/api/v1/streaming".to_string(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    async fn dial(&self, url: &Url, protocols: &[String]) -> Result<WsConnection> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Transport(format!("invalid websocket url: {e}")))?;

        if !protocols.is_empty() {
            let value = protocols
                .join(", ")
                .parse()
                .map_err(|_| Error::Transport("invalid subprotocol".to_string()))?;
            request
                .headers_mut()
                .insert("Sec-WebSocket-Protocol", value);
        }

        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| Error::Transport(format!("websocket connect failed: {e}")))?;

        debug!(url = %url, "websocket connected");

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsOutbound>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Result<String>>();

        tokio::spawn(async move {
            while let Some(outbound) = out_rx.recv().await {
                let result = match outbound {
                    WsOutbound::Text(text) => {
                        trace!(frame = %text, "sending control frame");
                        sink.send(WsMessage::text(text)).await
                    }
                    WsOutbound::Close => sink.close().await,
                };
                if result.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => {
                        if in_tx.send(Ok(text.to_string())).is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = in_tx.send(Err(Error::Transport(e.to_string())));
                        break;
                    }
                }
            }
        });

        Ok(WsConnection::from_parts(out_tx, in_rx))
    }
}

#[async_trait]
impl StreamingConnector for TungsteniteConnector {
    async fn connect(&self) -> Result<WsConnection> {
        let (url, protocols) = self.config.resolve_streaming(&self.path, None)?;
        self.dial(&url, &protocols).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn faked_connection_round_trips_frames() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let mut conn = WsConnection::from_parts(out_tx, in_rx);

        conn.send("{\"type\":\"subscribe\"}".to_string()).unwrap();
        assert_eq!(
            out_rx.recv().await,
            Some(WsOutbound::Text("{\"type\":\"subscribe\"}".to_string()))
        );

        in_tx.send(Ok("frame".to_string())).unwrap();
        assert_eq!(conn.recv().await.unwrap().unwrap(), "frame");

        drop(in_tx);
        assert!(conn.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_is_best_effort_after_drop() {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) = mpsc::unbounded_channel();
        let conn = WsConnection::from_parts(out_tx, in_rx);

        drop(out_rx);
        // Must not panic even though the pump is gone.
        conn.close();
        assert!(conn.send("late".to_string()).is_err());
    }
}
