//! End-to-end tests: a real relay on a loopback port with real WebSocket
//! clients connected through tokio-tungstenite.

use std::sync::Arc;
use std::time::Duration;

use clicksync_relay::application::SessionRegistry;
use clicksync_relay::domain::RelayConfig;
use clicksync_relay::infrastructure::RelayServer;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    url: String,
    base: String,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn start_relay() -> Harness {
    let config = RelayConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        ..RelayConfig::default()
    };
    let server = RelayServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let registry = server.registry();
    let shutdown = CancellationToken::new();
    tokio::spawn(server.run(shutdown.clone()));
    Harness {
        url: format!("ws://{addr}/ws"),
        base: format!("ws://{addr}"),
        registry,
        shutdown,
    }
}

async fn connect(url: &str) -> Client {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn wait_for_sessions(registry: &SessionRegistry, n: usize) {
    timeout(Duration::from_secs(5), async {
        while registry.len().await != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("relay did not reach the expected session count");
}

/// Reads the next text frame, skipping control frames.
async fn next_text(ws: &mut Client, within: Duration) -> Option<String> {
    timeout(within, async {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                return Some(text);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

#[tokio::test]
async fn test_click_reaches_other_client_once_and_not_sender() {
    // Arrange
    let relay = start_relay().await;
    let mut a = connect(&relay.url).await;
    let mut b = connect(&relay.url).await;
    wait_for_sessions(&relay.registry, 2).await;

    // Act
    a.send(Message::Text(r#"{"type":"sync_click","relX":0.25,"relY":0.75}"#.to_string()))
        .await
        .unwrap();

    // Assert: B gets exactly one execute_click with the same coordinates.
    let got = next_text(&mut b, Duration::from_secs(2)).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&got).unwrap();
    assert_eq!(value["type"], "execute_click");
    assert_eq!(value["relX"], 0.25);
    assert_eq!(value["relY"], 0.75);
    assert!(next_text(&mut b, Duration::from_millis(200)).await.is_none());

    // The sender never hears its own click back.
    assert!(next_text(&mut a, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_out_of_range_click_is_dropped_and_sender_stays_connected() {
    let relay = start_relay().await;
    let mut a = connect(&relay.url).await;
    let mut b = connect(&relay.url).await;
    wait_for_sessions(&relay.registry, 2).await;

    a.send(Message::Text(r#"{"type":"sync_click","relX":1.5,"relY":0.5}"#.to_string()))
        .await
        .unwrap();
    assert!(next_text(&mut b, Duration::from_millis(300)).await.is_none());

    // A valid click afterwards still goes through.
    a.send(Message::Text(r#"{"type":"sync_click","relX":0.5,"relY":0.5}"#.to_string()))
        .await
        .unwrap();
    assert!(next_text(&mut b, Duration::from_secs(2)).await.is_some());
    assert_eq!(relay.registry.len().await, 2);
}

#[tokio::test]
async fn test_disconnected_client_is_removed_from_registry() {
    let relay = start_relay().await;
    let a = connect(&relay.url).await;
    let mut b = connect(&relay.url).await;
    wait_for_sessions(&relay.registry, 2).await;

    drop(a);
    wait_for_sessions(&relay.registry, 1).await;

    // The remaining client is unaffected.
    b.send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .unwrap();
    assert_eq!(relay.registry.len().await, 1);
}

#[tokio::test]
async fn test_upgrade_on_wrong_path_is_refused() {
    let relay = start_relay().await;
    let result = connect_async(format!("{}/", relay.base)).await;
    assert!(result.is_err());
    assert!(relay.registry.is_empty().await);
}

#[tokio::test]
async fn test_plain_http_get_on_root_answers_health_check() {
    // Arrange
    let relay = start_relay().await;
    let addr = relay.base.trim_start_matches("ws://").to_string();
    let mut stream = TcpStream::connect(&addr).await.unwrap();

    // Act
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: relay\r\n\r\n")
        .await
        .unwrap();
    let mut reply = String::new();
    timeout(Duration::from_secs(2), stream.read_to_string(&mut reply))
        .await
        .unwrap()
        .unwrap();

    // Assert
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(reply.ends_with("\r\n\r\nWebSocket Server"));
    assert!(relay.registry.is_empty().await);
}

#[tokio::test]
async fn test_hotkey_advert_is_forwarded_as_hotkey_update() {
    let relay = start_relay().await;
    let mut a = connect(&relay.url).await;
    let mut b = connect(&relay.url).await;
    wait_for_sessions(&relay.registry, 2).await;

    a.send(Message::Text(
        r#"{"type":"update_hotkey","action":"sync_click","key":"f6"}"#.to_string(),
    ))
    .await
    .unwrap();

    let got = next_text(&mut b, Duration::from_secs(2)).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&got).unwrap();
    assert_eq!(value["type"], "hotkey_update");
    assert_eq!(value["key"], "f6");
}

#[tokio::test]
async fn test_shutdown_closes_client_connections() {
    let relay = start_relay().await;
    let mut a = connect(&relay.url).await;
    wait_for_sessions(&relay.registry, 1).await;

    relay.shutdown.cancel();

    // The client sees the stream end (Close frame or EOF) promptly.
    let ended = timeout(Duration::from_secs(3), async {
        loop {
            match a.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}
