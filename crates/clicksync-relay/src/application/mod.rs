//! Application layer for clicksync-relay.
//!
//! # Responsibilities
//!
//! - Tracking live sessions and fanning relayed events out to them
//!   ([`registry`])
//! - Deciding what to do with each inbound text frame ([`relay_service`])
//!
//! Sockets, handshakes, and task spawning for connections belong to the
//! infrastructure layer.

pub mod registry;
pub mod relay_service;

pub use registry::{DispatchReport, SessionId, SessionRegistry, SessionSink};
pub use relay_service::{handle_inbound, InboundOutcome};
