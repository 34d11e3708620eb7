//! Domain layer for clicksync-client: configuration types, no I/O.

pub mod config;

pub use config::{ClientConfig, ConnectionConfig, HotkeyConfig, SessionSettings, VirtualScreenConfig};
