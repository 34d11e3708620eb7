//! WebSocket server: accept loop and per-session read loops.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from ClickSync clients.
//! 3. Upgrading each connection to a WebSocket session, but only on the
//!    configured path (`/ws`); any other upgrade is answered with `404`.
//!    A plain HTTP `GET /` gets a short `200` text reply, which serves as a
//!    health check.
//! 4. Admitting the session into the [`SessionRegistry`] and running its read
//!    loop until the client disconnects, the session is evicted, or the relay
//!    shuts down.
//! 5. Running the idle sweeper alongside the accept loop.
//!
//! # Scalability
//!
//! Each client session runs in its own Tokio task.  The accept loop hands the
//! socket to a new task before accepting the next connection, so a slow
//! handshake never delays other clients.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::registry::SessionRegistry;
use crate::application::relay_service::handle_inbound;
use crate::domain::config::RelayConfig;
use crate::infrastructure::ws_session::WsSessionSink;

/// Body of the plain-HTTP reply on `/`.
const HEALTH_BODY: &str = "WebSocket Server";

/// Bytes of the request head inspected before the handshake.
const PEEK_LEN: usize = 2048;

// ── Public API ────────────────────────────────────────────────────────────────

/// A bound relay, ready to accept connections.
///
/// Splitting `bind` from `run` lets callers learn the actual listening
/// address (useful with port `0` in tests) before the accept loop starts.
pub struct RelayServer {
    listener: TcpListener,
    config: Arc<RelayConfig>,
    registry: Arc<SessionRegistry>,
}

impl RelayServer {
    /// Binds the TCP listener on `config.bind_addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (port in use, no
    /// permission).
    pub async fn bind(config: RelayConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("failed to bind relay listener on {}", config.bind_addr))?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
        })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to the session registry.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Runs the accept loop until `shutdown` is cancelled, then closes every
    /// session.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let Self {
            listener,
            config,
            registry,
        } = self;

        info!(
            "relay listening on {} (path {})",
            listener.local_addr().unwrap_or(config.bind_addr),
            config.ws_path
        );

        let sweeper = registry.spawn_idle_sweeper(
            config.sweep_interval,
            config.idle_timeout,
            shutdown.child_token(),
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested; stopping accept loop");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        debug!("new connection from {peer_addr}");
                        let registry = Arc::clone(&registry);
                        let config = Arc::clone(&config);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            handle_client_session(stream, peer_addr, registry, config, shutdown).await;
                        });
                    }
                    Err(e) => {
                        // Transient (e.g. too many open files); keep serving.
                        error!("accept error: {e}");
                    }
                },
            }
        }

        registry.close_all().await;
        if let Err(e) = sweeper.await {
            warn!("idle sweeper task failed: {e}");
        }
        info!("relay stopped");
        Ok(())
    }
}

/// Binds and runs the relay until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound.
pub async fn run_server(config: RelayConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    RelayServer::bind(config).await?.run(shutdown).await
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each per-session task: runs [`run_session`] and logs how
/// it ended.
async fn handle_client_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    config: Arc<RelayConfig>,
    shutdown: CancellationToken,
) {
    match run_session(stream, peer_addr, registry, config, shutdown).await {
        Ok(()) => debug!("session {peer_addr} closed normally"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one client session.
///
/// 1. Answers a plain HTTP `GET /` directly, or completes the WebSocket
///    handshake (both bounded by `handshake_timeout`).
/// 2. Admits the session into the registry.
/// 3. Reads frames until the client leaves or the session is evicted.
/// 4. Evicts the session (a no-op if something else already did).
async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    config: Arc<RelayConfig>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    // ── Step 1: handshake ─────────────────────────────────────────────────────
    let mut head = [0u8; PEEK_LEN];
    let peeked = timeout(config.handshake_timeout, stream.peek(&mut head))
        .await
        .map_err(|_| anyhow!("request from {peer_addr} timed out"))?
        .with_context(|| format!("failed to read request from {peer_addr}"))?;
    if is_plain_http_root(&head[..peeked]) {
        debug!("health check from {peer_addr}");
        return timeout(config.handshake_timeout, answer_health_check(stream))
            .await
            .map_err(|_| anyhow!("health check reply to {peer_addr} timed out"))?
            .with_context(|| format!("failed to answer health check from {peer_addr}"));
    }

    let path = config.ws_path.clone();
    let handshake = accept_hdr_async(stream, move |req: &Request, resp: Response| {
        check_upgrade_path(&path, req, resp)
    });
    let ws_stream = timeout(config.handshake_timeout, handshake)
        .await
        .map_err(|_| anyhow!("WebSocket handshake with {peer_addr} timed out"))?
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    // ── Step 2: admit ─────────────────────────────────────────────────────────
    let (ws_tx, mut ws_rx) = ws_stream.split();
    let sink = Arc::new(WsSessionSink::new(ws_tx, peer_addr, config.send_timeout));
    let evicted = sink.closed_token();
    let id = registry.admit(sink).await;
    info!(session = %id, peer = %peer_addr, "WebSocket session established");

    // ── Step 3: read loop ─────────────────────────────────────────────────────
    loop {
        let frame = tokio::select! {
            _ = evicted.cancelled() => {
                debug!(session = %id, "session evicted; leaving read loop");
                break;
            }
            _ = shutdown.cancelled() => break,
            frame = ws_rx.next() => frame,
        };

        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!(session = %id, "client WebSocket closed");
                break;
            }
            Some(Err(e)) => {
                warn!(session = %id, "WebSocket read error: {e}");
                break;
            }
            None => {
                debug!(session = %id, "client stream ended");
                break;
            }
        };

        // Any inbound frame proves the client is alive.
        registry.touch(id).await;

        match msg {
            WsMessage::Text(text) => {
                handle_inbound(&registry, id, &text).await;
            }
            WsMessage::Binary(_) => {
                warn!(session = %id, "unexpected binary frame (ignored)");
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => {
                // tokio-tungstenite queues the Pong reply itself.
                debug!(session = %id, "WebSocket control frame");
            }
            WsMessage::Close(_) => {
                debug!(session = %id, "Close frame received");
                break;
            }
            WsMessage::Frame(_) => {}
        }
    }

    // ── Step 4: leave ─────────────────────────────────────────────────────────
    registry.evict(id).await;
    Ok(())
}

// ── Handshake ─────────────────────────────────────────────────────────────────

/// Handshake callback: accepts the upgrade only on `expected_path`.
///
/// Any query string is ignored; `/ws?x=1` is accepted for path `/ws`.
fn check_upgrade_path(
    expected_path: &str,
    request: &Request,
    response: Response,
) -> Result<Response, ErrorResponse> {
    if request.uri().path() == expected_path {
        return Ok(response);
    }
    debug!("rejecting upgrade on path {}", request.uri().path());
    let mut not_found = ErrorResponse::new(Some("not found".to_string()));
    *not_found.status_mut() = StatusCode::NOT_FOUND;
    Err(not_found)
}

/// `true` if `head` holds a complete `GET /` request without an `Upgrade`
/// header.
fn is_plain_http_root(head: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let Some(end) = text.find("\r\n\r\n") else {
        return false;
    };
    let mut lines = text[..end].split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    if request_line.next() != Some("GET") {
        return false;
    }
    let target = request_line.next().unwrap_or_default();
    if target.split('?').next() != Some("/") {
        return false;
    }
    !lines.any(|line| {
        line.split_once(':')
            .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case("upgrade"))
    })
}

async fn answer_health_check(mut stream: TcpStream) -> io::Result<()> {
    let reply = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{HEALTH_BODY}",
        HEALTH_BODY.len()
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        Request::builder().uri(uri).body(()).unwrap()
    }

    #[test]
    fn test_upgrade_on_expected_path_is_accepted() {
        let resp = check_upgrade_path("/ws", &request("/ws"), Response::new(()));
        assert!(resp.is_ok());
    }

    #[test]
    fn test_upgrade_with_query_string_is_accepted() {
        let resp = check_upgrade_path("/ws", &request("/ws?client=a"), Response::new(()));
        assert!(resp.is_ok());
    }

    #[test]
    fn test_upgrade_on_other_path_is_404() {
        let err = check_upgrade_path("/ws", &request("/"), Response::new(())).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upgrade_on_path_prefix_is_404() {
        let err = check_upgrade_path("/ws", &request("/ws/extra"), Response::new(())).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_plain_get_root_is_health_check() {
        assert!(is_plain_http_root(b"GET / HTTP/1.1\r\nHost: relay\r\n\r\n"));
        assert!(is_plain_http_root(b"GET /?check=1 HTTP/1.1\r\n\r\n"));
    }

    #[test]
    fn test_upgrade_request_is_not_health_check() {
        let head = b"GET / HTTP/1.1\r\nHost: relay\r\nConnection: Upgrade\r\nUPGRADE: websocket\r\n\r\n";
        assert!(!is_plain_http_root(head));
    }

    #[test]
    fn test_other_requests_are_not_health_checks() {
        assert!(!is_plain_http_root(b"GET /ws HTTP/1.1\r\n\r\n"));
        assert!(!is_plain_http_root(b"POST / HTTP/1.1\r\n\r\n"));
        // Head not complete yet.
        assert!(!is_plain_http_root(b"GET / HTTP/1.1\r\nHost: re"));
    }

    #[tokio::test]
    async fn test_bind_on_port_zero_reports_real_port() {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..RelayConfig::default()
        };
        let server = RelayServer::bind(config).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_run_returns_after_shutdown() {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..RelayConfig::default()
        };
        let server = RelayServer::bind(config).await.unwrap();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        server.run(shutdown).await.unwrap();
    }
}
