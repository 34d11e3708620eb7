//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! It is built from CLI arguments in `main.rs` or from defaults in tests.
//!
//! The timing values are tunable rather than fixed: the defaults reproduce
//! the behaviour of the first deployment (60 s sweep, 120 s idle limit), but
//! nothing in the registry depends on those exact numbers.

use std::net::SocketAddr;
use std::time::Duration;

/// All runtime configuration for the relay server.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// The address and port the WebSocket server binds to.
    pub bind_addr: SocketAddr,

    /// The only HTTP path accepted for the WebSocket upgrade.
    pub ws_path: String,

    /// Deadline for a single outbound write to one session.
    ///
    /// A recipient that does not accept the frame within this window is
    /// evicted; it never delays delivery to the other recipients.
    pub send_timeout: Duration,

    /// How often the idle sweeper runs.
    pub sweep_interval: Duration,

    /// A session with no inbound frame (including pings) for longer than this
    /// is evicted by the sweeper.
    pub idle_timeout: Duration,

    /// Maximum time allowed for the WebSocket upgrade handshake.
    pub handshake_timeout: Duration,
}

impl Default for RelayConfig {
    /// | Field             | Default        |
    /// |-------------------|----------------|
    /// | bind_addr         | `0.0.0.0:8765` |
    /// | ws_path           | `/ws`          |
    /// | send_timeout      | 2 seconds      |
    /// | sweep_interval    | 60 seconds     |
    /// | idle_timeout      | 120 seconds    |
    /// | handshake_timeout | 60 seconds     |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8765)),
            ws_path: "/ws".to_string(),
            send_timeout: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(120),
            handshake_timeout: Duration::from_secs(60),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
