//! WebSocket transport to the relay.
//!
//! One [`WsTransport`] wraps one `WebSocketStream`, split into a write half
//! and a read half so that `send` and `receive` can run concurrently.
//!
//! # Liveness
//!
//! `ping` sends a WebSocket Ping control frame; the relay's WebSocket stack
//! answers with a Pong.  `receive` treats *any* inbound frame (text, ping,
//! pong) as proof of life and returns [`TransportError::Timeout`] only when
//! nothing arrived for the whole liveness window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clicksync_core::{decode_event, encode_event, RelayEvent, TransportError};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::transport::{Connector, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live WebSocket connection to the relay.
pub struct WsTransport {
    writer: Mutex<SplitSink<WsStream, WsMessage>>,
    reader: Mutex<SplitStream<WsStream>>,
    send_timeout: Duration,
    liveness_timeout: Duration,
    closed: CancellationToken,
}

impl WsTransport {
    /// Wraps an established WebSocket.
    pub fn new(stream: WsStream, send_timeout: Duration, liveness_timeout: Duration) -> Self {
        let (writer, reader) = stream.split();
        Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            send_timeout,
            liveness_timeout,
            closed: CancellationToken::new(),
        }
    }

    async fn write(&self, msg: WsMessage) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let write = async {
            let mut writer = self.writer.lock().await;
            writer.send(msg).await
        };
        match timeout(self.send_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                debug!("WebSocket write failed: {e}");
                Err(TransportError::Closed)
            }
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, event: &RelayEvent) -> Result<(), TransportError> {
        let json = encode_event(event).map_err(|e| {
            warn!("failed to encode {}: {e}", event.type_name());
            TransportError::Closed
        })?;
        self.write(WsMessage::Text(json)).await
    }

    async fn receive(&self) -> Result<RelayEvent, TransportError> {
        let mut reader = self.reader.lock().await;
        loop {
            let next = tokio::select! {
                _ = self.closed.cancelled() => return Err(TransportError::Closed),
                next = timeout(self.liveness_timeout, reader.next()) => next,
            };

            let msg = match next {
                Err(_) => return Err(TransportError::Timeout),
                Ok(None) => return Err(TransportError::Closed),
                Ok(Some(Err(e))) => {
                    debug!("WebSocket read failed: {e}");
                    return Err(TransportError::Closed);
                }
                Ok(Some(Ok(msg))) => msg,
            };

            match msg {
                WsMessage::Text(text) => match decode_event(&text) {
                    Ok(Some(event)) => return Ok(event),
                    Ok(None) => debug!("ignoring message with unknown type"),
                    Err(e) => warn!("dropping invalid message from relay: {e}"),
                },
                WsMessage::Close(_) => return Err(TransportError::Closed),
                WsMessage::Binary(_) => warn!("unexpected binary frame from relay (ignored)"),
                // Control frames only refresh the liveness window.
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            }
        }
    }

    async fn ping(&self) -> Result<(), TransportError> {
        self.write(WsMessage::Ping(Vec::new())).await
    }

    async fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        let shutdown = async {
            let mut writer = self.writer.lock().await;
            let _ = writer.send(WsMessage::Close(None)).await;
            let _ = writer.close().await;
        };
        if timeout(self.send_timeout, shutdown).await.is_err() {
            debug!("close handshake timed out");
        }
    }
}

/// Opens [`WsTransport`]s to a fixed relay URL.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    send_timeout: Duration,
    liveness_timeout: Duration,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, send_timeout: Duration, liveness_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            send_timeout,
            liveness_timeout,
        }
    }

    /// The relay URL this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Arc<dyn Transport>, TransportError> {
        let (stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(format!("{}: {e}", self.url)))?;
        info!("connected to relay at {}", self.url);
        Ok(Arc::new(WsTransport::new(
            stream,
            self.send_timeout,
            self.liveness_timeout,
        )))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
