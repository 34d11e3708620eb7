//! Client configuration types.
//!
//! [`ClientConfig`] is the on-disk schema (TOML, see
//! `infrastructure::storage::config`).  Every field has a serde default, so
//! an empty or partial file is valid:
//!
//! ```toml
//! log_level = "info"
//!
//! [connection]
//! server_url = "ws://192.168.1.10:8765/ws"
//! reconnect_delay_secs = 2
//! max_reconnect_delay_secs = 30
//!
//! [hotkey]
//! key = "f5"
//! click_locally = true
//! ```
//!
//! [`SessionSettings`] is the runtime view the session manager consumes,
//! with plain numbers already turned into [`Duration`]s.

use std::time::Duration;

use clicksync_core::keymap::UnknownHotkeyLabel;
use clicksync_core::HotkeyLabel;
use serde::{Deserialize, Serialize};

// ── On-disk schema ────────────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Fallback `tracing` filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub hotkey: HotkeyConfig,
    #[serde(default)]
    pub screen: VirtualScreenConfig,
}

/// How to reach the relay and how hard to try.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// WebSocket URL of the relay, including the `/ws` path.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Upper bound on one connection attempt (TCP + WebSocket handshake).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// First delay before reconnecting after a failure.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// The reconnect delay doubles after each failed attempt up to this cap.
    #[serde(default = "default_max_reconnect_delay_secs")]
    pub max_reconnect_delay_secs: u64,
    /// Period of the liveness ping sent to the relay.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// With no inbound frame for this long, the connection is considered dead.
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,
    /// Deadline for a single outbound write.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

/// Hotkey behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotkeyConfig {
    /// Hotkey label, e.g. `"f5"`, `"escape"`.
    #[serde(default = "default_hotkey")]
    pub key: String,
    /// Click locally before broadcasting the click to the other machines.
    #[serde(default = "default_true")]
    pub click_locally: bool,
}

/// Size of the virtual screen used by the headless input driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VirtualScreenConfig {
    #[serde(default = "default_screen_width")]
    pub width: u32,
    #[serde(default = "default_screen_height")]
    pub height: u32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_server_url() -> String {
    "ws://localhost:8765/ws".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_reconnect_delay_secs() -> u64 {
    2
}
fn default_max_reconnect_delay_secs() -> u64 {
    30
}
fn default_ping_interval_secs() -> u64 {
    30
}
fn default_liveness_timeout_secs() -> u64 {
    75
}
fn default_send_timeout_ms() -> u64 {
    2000
}
fn default_hotkey() -> String {
    HotkeyLabel::default().as_str().to_string()
}
fn default_true() -> bool {
    true
}
fn default_screen_width() -> u32 {
    1920
}
fn default_screen_height() -> u32 {
    1080
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            connection: ConnectionConfig::default(),
            hotkey: HotkeyConfig::default(),
            screen: VirtualScreenConfig::default(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_reconnect_delay_secs: default_max_reconnect_delay_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            liveness_timeout_secs: default_liveness_timeout_secs(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key: default_hotkey(),
            click_locally: default_true(),
        }
    }
}

impl Default for VirtualScreenConfig {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
        }
    }
}

impl ClientConfig {
    /// Parses the configured hotkey label.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownHotkeyLabel`] if `hotkey.key` is not a supported key.
    pub fn hotkey_label(&self) -> Result<HotkeyLabel, UnknownHotkeyLabel> {
        self.hotkey.key.parse()
    }

    /// Timing and behaviour settings for the session manager.
    pub fn session_settings(&self) -> SessionSettings {
        let c = &self.connection;
        SessionSettings {
            connect_timeout: Duration::from_secs(c.connect_timeout_secs),
            reconnect_delay: Duration::from_secs(c.reconnect_delay_secs),
            max_reconnect_delay: Duration::from_secs(c.max_reconnect_delay_secs),
            ping_interval: Duration::from_secs(c.ping_interval_secs),
            click_locally: self.hotkey.click_locally,
        }
    }

    /// Per-write deadline for the transport.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.send_timeout_ms)
    }

    /// Inbound silence after which the transport reports a timeout.
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.liveness_timeout_secs)
    }
}

// ── Runtime settings ──────────────────────────────────────────────────────────

/// Settings consumed by `ClientSessionManager`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Upper bound on one connection attempt.
    pub connect_timeout: Duration,
    /// First reconnect delay; doubles per failed attempt.
    pub reconnect_delay: Duration,
    /// Cap for the reconnect delay.  Equal to `reconnect_delay` for a fixed
    /// delay.
    pub max_reconnect_delay: Duration,
    /// Period of the liveness ping.
    pub ping_interval: Duration,
    /// Click locally before broadcasting.
    pub click_locally: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        ClientConfig::default().session_settings()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_url_targets_ws_path_on_8765() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.connection.server_url, "ws://localhost:8765/ws");
    }

    #[test]
    fn test_default_hotkey_is_f5() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.hotkey.key, "f5");
        assert_eq!(cfg.hotkey_label().unwrap(), HotkeyLabel::F5);
        assert!(cfg.hotkey.click_locally);
    }

    #[test]
    fn test_default_session_settings() {
        let s = SessionSettings::default();
        assert_eq!(s.connect_timeout, Duration::from_secs(5));
        assert_eq!(s.reconnect_delay, Duration::from_secs(2));
        assert_eq!(s.max_reconnect_delay, Duration::from_secs(30));
        assert_eq!(s.ping_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_liveness_window_exceeds_ping_interval() {
        // The relay answers each ping with a pong, so a healthy link always
        // shows inbound traffic within one ping interval.
        let cfg = ClientConfig::default();
        assert!(cfg.liveness_timeout() > cfg.session_settings().ping_interval);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        // Arrange
        let text = r#"
            [hotkey]
            key = "escape"

            [connection]
            server_url = "ws://10.0.0.2:8765/ws"
        "#;

        // Act
        let cfg: ClientConfig = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(cfg.hotkey_label().unwrap(), HotkeyLabel::Escape);
        assert!(cfg.hotkey.click_locally);
        assert_eq!(cfg.connection.server_url, "ws://10.0.0.2:8765/ws");
        assert_eq!(cfg.connection.reconnect_delay_secs, 2);
        assert_eq!(cfg.screen, VirtualScreenConfig::default());
    }

    #[test]
    fn test_unknown_hotkey_is_reported() {
        let mut cfg = ClientConfig::default();
        cfg.hotkey.key = "capslock".to_string();
        assert!(cfg.hotkey_label().is_err());
    }

    #[test]
    fn test_send_timeout_is_in_milliseconds() {
        let mut cfg = ClientConfig::default();
        cfg.connection.send_timeout_ms = 1500;
        assert_eq!(cfg.send_timeout(), Duration::from_millis(1500));
    }
}
