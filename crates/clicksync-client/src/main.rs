//! ClickSync client: entry point.
//!
//! Connects to the relay, watches the hotkey and mirrors clicks.  This build
//! runs headless: clicks land on a virtual screen and are logged, and the
//! hotkey is "pressed" by typing its name on stdin (type `help` for the list
//! of console commands).
//!
//! # Usage
//!
//! ```text
//! clicksync-client [OPTIONS]
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config dir]
//!   --server-url <URL>       Relay URL, e.g. ws://192.168.1.10:8765/ws
//!   --hotkey <KEY>           Hotkey label, e.g. f5
//!   --no-local-click         Only broadcast; do not click on this machine
//!   --write-default-config   Write a default config file and exit
//! ```
//!
//! Command-line values override the config file.  Log verbosity follows
//! `RUST_LOG`, falling back to the config's `log_level`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use clicksync_core::HotkeyLabel;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clicksync_client::application::{
    ClientSessionManager, ConnectionState, GlobalHotkeyWatcher, LocalInputDriver,
};
use clicksync_client::domain::ClientConfig;
use clicksync_client::infrastructure::hotkey::{ConsoleCommand, ConsoleHotkeyWatcher, CONSOLE_HELP};
use clicksync_client::infrastructure::input_driver::VirtualScreenDriver;
use clicksync_client::infrastructure::network::WsConnector;
use clicksync_client::infrastructure::storage::{
    config_file_path, load_config_from, save_config_to,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// ClickSync client.
#[derive(Debug, Parser)]
#[command(
    name = "clicksync-client",
    about = "Mirrors a hotkey-triggered click to every machine connected to the relay",
    version
)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(long, env = "CLICKSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// WebSocket URL of the relay.
    #[arg(long, env = "CLICKSYNC_SERVER_URL")]
    server_url: Option<String>,

    /// Hotkey label (f1-f12, escape, enter, ...).
    #[arg(long, env = "CLICKSYNC_HOTKEY")]
    hotkey: Option<String>,

    /// Do not click locally when the hotkey is pressed.
    #[arg(long)]
    no_local_click: bool,

    /// Write a config file with default values and exit.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("no --config given"),
        }
    }

    /// Layers the command-line overrides on top of `config`.
    fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.server_url {
            config.connection.server_url = url.clone();
        }
        if let Some(key) = &self.hotkey {
            config.hotkey.key = key.clone();
        }
        if self.no_local_click {
            config.hotkey.click_locally = false;
        }
    }
}

/// Checks the values the runtime depends on and returns the parsed hotkey.
///
/// # Errors
///
/// Returns an error if the URL is not `ws://`/`wss://`, the hotkey is not
/// supported, or a timeout is zero.
fn validate(config: &ClientConfig) -> anyhow::Result<HotkeyLabel> {
    let url = &config.connection.server_url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        bail!("server URL must start with ws:// or wss://: '{url}'");
    }
    let hotkey = config.hotkey_label()?;

    let c = &config.connection;
    if c.connect_timeout_secs == 0 || c.send_timeout_ms == 0 || c.liveness_timeout_secs == 0 {
        bail!("connection timeouts must be greater than zero");
    }
    if config.screen.width == 0 || config.screen.height == 0 {
        bail!(
            "virtual screen size must be non-zero: {}x{}",
            config.screen.width,
            config.screen.height
        );
    }
    Ok(hotkey)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = cli.config_path()?;

    if cli.write_default_config {
        if path.exists() {
            bail!("refusing to overwrite existing config at {}", path.display());
        }
        save_config_to(&ClientConfig::default(), &path)?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = load_config_from(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    cli.apply_overrides(&mut config);
    let hotkey = validate(&config)?;

    // `RUST_LOG` wins; otherwise use the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "ClickSync client starting: relay={}, hotkey={hotkey}, click_locally={}",
        config.connection.server_url, config.hotkey.click_locally
    );

    // ── Wiring ────────────────────────────────────────────────────────────────
    let driver = Arc::new(VirtualScreenDriver::new(config.screen.width, config.screen.height));
    let watcher = Arc::new(ConsoleHotkeyWatcher::new());
    let connector = Arc::new(WsConnector::new(
        config.connection.server_url.clone(),
        config.send_timeout(),
        config.liveness_timeout(),
    ));
    let manager = ClientSessionManager::new(
        config.session_settings(),
        connector,
        Arc::clone(&driver) as Arc<dyn LocalInputDriver>,
        Arc::clone(&watcher) as Arc<dyn GlobalHotkeyWatcher>,
        hotkey,
    );

    let supervisor = tokio::spawn(Arc::clone(&manager).run());

    let mut status = manager.subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let state = *status.borrow_and_update();
            match state {
                ConnectionState::Disconnected => warn!("relay connection state: {state}"),
                _ => info!("relay connection state: {state}"),
            }
        }
    });

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                shutdown_on_signal.cancel();
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Console loop ──────────────────────────────────────────────────────────
    println!("type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("stdin closed; running until Ctrl+C");
                shutdown.cancelled().await;
                break;
            }
            Err(e) => {
                warn!("failed to read stdin: {e}");
                shutdown.cancelled().await;
                break;
            }
        };

        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            ConsoleCommand::Press(label) => {
                if !watcher.fire(label) {
                    println!("hotkey is not armed ({})", manager.state());
                }
            }
            ConsoleCommand::SetHotkey(label) => match manager.set_hotkey(label).await {
                Ok(()) => println!("hotkey is now {label}"),
                Err(e) => println!("could not change hotkey: {e}"),
            },
            ConsoleCommand::MoveCursor(x, y) => {
                let (x, y) = driver.set_cursor(x, y);
                println!("cursor at ({x}, {y})");
            }
            ConsoleCommand::Retry => {
                if !manager.retry_now() {
                    println!("already connected");
                }
            }
            ConsoleCommand::Status => {
                println!("{}, hotkey {}", manager.state(), manager.hotkey());
            }
            ConsoleCommand::Help => println!("{CONSOLE_HELP}"),
            ConsoleCommand::Quit => break,
        }
    }

    manager.shutdown();
    if let Err(e) = supervisor.await {
        warn!("session manager task failed: {e}");
    }
    info!("ClickSync client stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
