//! Infrastructure layer for clicksync-client.
//!
//! # Responsibilities
//!
//! - WebSocket connection to the relay (`network`)
//! - Synthetic mouse input (`input_driver`)
//! - Global hotkey hooks (`hotkey`)
//! - Reading and writing the TOML config file (`storage`)
//!
//! Each concern has a real adapter and a mock used by tests.  The shipped
//! binary runs headless: a logging input driver with a virtual screen and a
//! console-driven hotkey watcher.

pub mod hotkey;
pub mod input_driver;
pub mod network;
pub mod storage;
