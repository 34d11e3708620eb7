//! Domain layer for clicksync-relay.
//!
//! Plain configuration types with no dependencies on I/O or async runtimes.

pub mod config;

pub use config::RelayConfig;
