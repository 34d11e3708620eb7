//! The outbound half of one client WebSocket.
//!
//! [`WsSessionSink`] wraps the write half of a split `WebSocketStream` and
//! implements [`SessionSink`] for the registry.  Each write is bounded by
//! `send_timeout`, and the bound covers waiting for the write lock as well as
//! the socket write itself.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use clicksync_core::{encode_event, RelayEvent, TransportError};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::application::registry::SessionSink;

type WsWriter = SplitSink<WebSocketStream<TcpStream>, WsMessage>;

/// Write half of a client session.
pub struct WsSessionSink {
    writer: Mutex<WsWriter>,
    peer_addr: SocketAddr,
    send_timeout: Duration,
    closed: CancellationToken,
}

impl WsSessionSink {
    /// Wraps the write half of an accepted WebSocket.
    pub fn new(writer: WsWriter, peer_addr: SocketAddr, send_timeout: Duration) -> Self {
        Self {
            writer: Mutex::new(writer),
            peer_addr,
            send_timeout,
            closed: CancellationToken::new(),
        }
    }

    /// A token that fires once [`SessionSink::close`] has been called.
    ///
    /// The session's read loop selects on it so that an eviction initiated
    /// elsewhere (failed dispatch, idle sweep) also ends the read loop.
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}

#[async_trait]
impl SessionSink for WsSessionSink {
    async fn send(&self, event: &RelayEvent) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }

        let json = encode_event(event).map_err(|e| {
            error!(peer = %self.peer_addr, error = %e, "failed to encode outbound event");
            TransportError::Closed
        })?;

        let write = async {
            let mut writer = self.writer.lock().await;
            writer.send(WsMessage::Text(json)).await
        };

        match timeout(self.send_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                debug!(peer = %self.peer_addr, error = %e, "WebSocket write failed");
                Err(TransportError::Closed)
            }
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();

        // Best effort: a peer that stopped reading gets no more than one
        // write deadline to accept the Close frame.
        let shutdown = async {
            let mut writer = self.writer.lock().await;
            let _ = writer.send(WsMessage::Close(None)).await;
            let _ = writer.close().await;
        };
        if timeout(self.send_timeout, shutdown).await.is_err() {
            debug!(peer = %self.peer_addr, "close handshake timed out");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
