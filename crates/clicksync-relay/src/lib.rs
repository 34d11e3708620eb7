//! clicksync-relay library crate.
//!
//! The relay is the hub every ClickSync client connects to.  When one client
//! reports a hotkey click (`sync_click`), the relay forwards it as an
//! `execute_click` to every *other* connected client.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Clients (JSON over WebSocket, path /ws)
//!         ↕
//! [clicksync-relay]
//!   ├── domain/           RelayConfig
//!   ├── application/      SessionRegistry (admit, dispatch, touch, evict, sweep)
//!   │                     relay_service: inbound frame → registry action
//!   └── infrastructure/
//!         ├── ws_server/  TCP accept loop + WebSocket handshake (tokio-tungstenite)
//!         └── ws_session/ per-connection SessionSink with write deadline
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `clicksync-core`; it sees sessions
//!   only through the [`application::registry::SessionSink`] trait.
//! - `infrastructure` owns sockets and implements `SessionSink`.

/// Domain layer: configuration.
pub mod domain;

/// Application layer: the session registry and inbound message handling.
pub mod application;

/// Infrastructure layer: WebSocket server and per-session sinks.
pub mod infrastructure;
