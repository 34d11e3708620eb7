//! ClickSync relay: entry point.
//!
//! Every ClickSync client connects here over WebSocket.  When one client
//! reports a hotkey click, the relay forwards it to all the others.
//!
//! # Usage
//!
//! ```text
//! clicksync-relay [OPTIONS]
//!
//! Options:
//!   --bind                <IP>    Address to listen on [default: 0.0.0.0]
//!   --port                <PORT>  TCP port [default: 8765]
//!   --path                <PATH>  WebSocket upgrade path [default: /ws]
//!   --send-timeout-ms     <MS>    Per-recipient write deadline [default: 2000]
//!   --sweep-interval-secs <SECS>  Idle sweep period [default: 60]
//!   --idle-timeout-secs   <SECS>  Evict sessions silent this long [default: 120]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                        | Default   |
//! |---------------------------------|-----------|
//! | `CLICKSYNC_BIND`                | `0.0.0.0` |
//! | `CLICKSYNC_PORT`                | `8765`    |
//! | `CLICKSYNC_PATH`                | `/ws`     |
//! | `CLICKSYNC_SEND_TIMEOUT_MS`     | `2000`    |
//! | `CLICKSYNC_SWEEP_INTERVAL_SECS` | `60`      |
//! | `CLICKSYNC_IDLE_TIMEOUT_SECS`   | `120`     |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clicksync_relay::domain::RelayConfig;
use clicksync_relay::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// ClickSync relay server.
#[derive(Debug, Parser)]
#[command(
    name = "clicksync-relay",
    about = "Relays hotkey clicks between ClickSync clients",
    version
)]
struct Cli {
    /// IP address to bind to.  `0.0.0.0` accepts LAN connections.
    #[arg(long, default_value = "0.0.0.0", env = "CLICKSYNC_BIND")]
    bind: String,

    /// TCP port to listen on.
    #[arg(long, default_value_t = 8765, env = "CLICKSYNC_PORT")]
    port: u16,

    /// HTTP path on which the WebSocket upgrade is accepted.
    #[arg(long, default_value = "/ws", env = "CLICKSYNC_PATH")]
    path: String,

    /// Deadline for one write to one client, in milliseconds.
    #[arg(long, default_value_t = 2000, env = "CLICKSYNC_SEND_TIMEOUT_MS")]
    send_timeout_ms: u64,

    /// How often idle sessions are swept, in seconds.
    #[arg(long, default_value_t = 60, env = "CLICKSYNC_SWEEP_INTERVAL_SECS")]
    sweep_interval_secs: u64,

    /// Sessions with no inbound traffic for this many seconds are evicted.
    #[arg(long, default_value_t = 120, env = "CLICKSYNC_IDLE_TIMEOUT_SECS")]
    idle_timeout_secs: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address, `--path` does not
    /// start with `/`, or any duration is zero.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        if !self.path.starts_with('/') {
            bail!("WebSocket path must start with '/': '{}'", self.path);
        }
        if self.send_timeout_ms == 0 || self.sweep_interval_secs == 0 || self.idle_timeout_secs == 0 {
            bail!("timeouts and intervals must be greater than zero");
        }

        Ok(RelayConfig {
            bind_addr: SocketAddr::new(ip, self.port),
            ws_path: self.path,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            ..RelayConfig::default()
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `RUST_LOG` wins; otherwise log at `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_relay_config()?;

    info!(
        "ClickSync relay starting: bind={}, path={}, idle_timeout={:?}",
        config.bind_addr, config.ws_path, config.idle_timeout
    );

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                shutdown_on_signal.cancel();
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, shutdown).await?;

    info!("ClickSync relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
