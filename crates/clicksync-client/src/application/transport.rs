//! Transport seams between the session manager and the network.
//!
//! A [`Transport`] is one live, bidirectional message channel to the relay.
//! A [`Connector`] produces a fresh `Transport` per connection attempt.
//!
//! Implementations handle WebSocket control frames themselves: an inbound
//! ping is answered without surfacing as an event, and malformed or
//! unknown messages are skipped inside [`Transport::receive`].

use std::sync::Arc;

use async_trait::async_trait;
use clicksync_core::{RelayEvent, TransportError};

/// One live connection to the relay.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Writes one event.  Bounded by the transport's write deadline;
    /// a timeout is reported as [`TransportError::Timeout`].
    async fn send(&self, event: &RelayEvent) -> Result<(), TransportError>;

    /// Waits for the next application event.
    ///
    /// Returns [`TransportError::Timeout`] when nothing at all (not even a
    /// control frame) arrived within the liveness window, and
    /// [`TransportError::Closed`] once the connection is gone.
    async fn receive(&self) -> Result<RelayEvent, TransportError>;

    /// Sends a liveness probe.
    async fn ping(&self) -> Result<(), TransportError>;

    /// Closes the connection.  Safe to call more than once.
    async fn close(&self);
}

/// Opens new connections to the relay.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Performs one connection attempt.
    async fn connect(&self) -> Result<Arc<dyn Transport>, TransportError>;
}
