//! clicksync-client library crate.
//!
//! A ClickSync client keeps one WebSocket connection to the relay.  When the
//! user presses the configured hotkey, the client clicks at the current
//! cursor position and reports the position (as screen fractions) to the
//! relay, which tells every other client to click at the same relative spot.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! [clicksync-client]
//!   ├── domain/           ClientConfig (TOML schema), SessionSettings
//!   ├── application/
//!   │     ├── transport        Transport / Connector traits
//!   │     ├── replay_click     LocalInputDriver trait + replay use case
//!   │     ├── hotkey_watch     GlobalHotkeyWatcher trait + HotkeyWatchLifecycle
//!   │     ├── backoff          exponential reconnect delay
//!   │     └── session_manager  ClientSessionManager state machine
//!   └── infrastructure/
//!         ├── network/       WebSocket transport (tokio-tungstenite), in-memory pair
//!         ├── input_driver/  headless logging driver, recording mock
//!         ├── hotkey/        console watcher, mock watcher
//!         └── storage/       TOML config file
//! ```
//!
//! The application layer only talks to the outside world through traits, so
//! the whole state machine runs in tests against in-memory adapters.

pub mod application;
pub mod domain;
pub mod infrastructure;
