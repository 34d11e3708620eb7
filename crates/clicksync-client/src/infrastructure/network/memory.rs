//! In-process transport for tests.
//!
//! [`memory_pair`] returns a client-side [`MemoryTransport`] and the relay
//! side of the same link as a [`MemoryPeer`].  [`MemoryConnector`] hands out
//! queued transports (or failures) one per `connect` call, which lets a test
//! script a whole reconnect sequence without sockets.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use clicksync_core::{RelayEvent, TransportError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::transport::{Connector, Transport};

/// Client end of an in-memory link.
pub struct MemoryTransport {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<RelayEvent>>,
    outbound: mpsc::UnboundedSender<RelayEvent>,
    closed: CancellationToken,
    pings: AtomicUsize,
    fail_sends: AtomicBool,
}

impl MemoryTransport {
    /// Number of successful `ping` calls.
    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `send` fail with [`TransportError::Timeout`].
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// `true` once either side closed the link.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, event: &RelayEvent) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout);
        }
        self.outbound
            .send(event.clone())
            .map_err(|_| TransportError::Closed)
    }

    async fn receive(&self) -> Result<RelayEvent, TransportError> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            event = inbound.recv() => event.ok_or(TransportError::Closed),
        }
    }

    async fn ping(&self) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.cancel();
    }
}

/// Relay end of an in-memory link.
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<RelayEvent>,
    from_client: mpsc::UnboundedReceiver<RelayEvent>,
    closed: CancellationToken,
}

impl MemoryPeer {
    /// Delivers `event` to the client.  Returns `false` if the link is gone.
    pub fn send(&self, event: RelayEvent) -> bool {
        !self.closed.is_cancelled() && self.to_client.send(event).is_ok()
    }

    /// Waits for the next event the client sent.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.from_client.recv().await
    }

    /// Returns an already-sent event without waiting.
    pub fn try_recv(&mut self) -> Option<RelayEvent> {
        self.from_client.try_recv().ok()
    }

    /// Drops the link from the relay side, as a server-initiated close would.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// `true` once either side closed the link.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Creates a connected client/relay pair.
pub fn memory_pair() -> (Arc<MemoryTransport>, MemoryPeer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();
    let closed = CancellationToken::new();
    let transport = Arc::new(MemoryTransport {
        inbound: tokio::sync::Mutex::new(inbound),
        outbound,
        closed: closed.clone(),
        pings: AtomicUsize::new(0),
        fail_sends: AtomicBool::new(false),
    });
    let peer = MemoryPeer {
        to_client,
        from_client,
        closed,
    };
    (transport, peer)
}

/// A [`Connector`] that replays a scripted queue of outcomes.
///
/// Once the queue is empty every attempt fails with
/// [`TransportError::ConnectFailed`].
#[derive(Default)]
pub struct MemoryConnector {
    queue: Mutex<VecDeque<Result<Arc<MemoryTransport>, TransportError>>>,
    attempts: AtomicUsize,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful attempt that yields `transport`.
    pub fn push_transport(&self, transport: Arc<MemoryTransport>) {
        self.lock().push_back(Ok(transport));
    }

    /// Queues a failed attempt.
    pub fn push_failure(&self, error: TransportError) {
        self.lock().push_back(Err(error));
    }

    /// Number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Arc<MemoryTransport>, TransportError>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn Transport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.lock().pop_front();
        match next {
            Some(Ok(transport)) => Ok(transport),
            Some(Err(e)) => Err(e),
            None => Err(TransportError::ConnectFailed("no connection queued".to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
