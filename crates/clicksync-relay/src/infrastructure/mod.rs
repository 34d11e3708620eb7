//! Infrastructure layer for clicksync-relay.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and accepting connections
//! - Performing the WebSocket upgrade handshake (path `/ws` only)
//! - Running one read loop per session
//! - Writing relayed events to each session under a deadline
//!
//! Deciding what an inbound message means is the application layer's job.

pub mod ws_server;
pub mod ws_session;

pub use ws_server::{run_server, RelayServer};
pub use ws_session::WsSessionSink;
