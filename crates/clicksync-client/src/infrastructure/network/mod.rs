//! Network infrastructure for the client.
//!
//! - [`websocket`]: the real transport, a tokio-tungstenite WebSocket to the
//!   relay.
//! - [`memory`]: an in-process transport pair for tests.

pub mod memory;
pub mod websocket;

pub use memory::{memory_pair, MemoryConnector, MemoryPeer, MemoryTransport};
pub use websocket::{WsConnector, WsTransport};
