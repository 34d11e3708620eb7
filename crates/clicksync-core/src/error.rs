//! Transport error taxonomy shared by the client and the relay.
//!
//! Both sides of a connection classify network failures the same way so that
//! their state machines can react uniformly: every variant is a reason to
//! close the session.  A timed-out write is not retried in place; the owner
//! treats it exactly like a hard failure (the client reconnects, the relay
//! evicts).

use thiserror::Error;

/// Errors reported by a transport session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection (TCP connect or WebSocket handshake) could not be set up.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// A write did not complete, or no inbound traffic arrived, within the
    /// configured deadline.
    #[error("transport deadline exceeded")]
    Timeout,

    /// The peer closed the connection or the underlying stream failed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Returns `true` when the error was caused by a deadline rather than an
    /// explicit close.  Used only for log wording; callers handle both alike.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}
