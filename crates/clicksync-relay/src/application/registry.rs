//! SessionRegistry: the set of live client sessions and the fan-out logic.
//!
//! # Concurrency model
//!
//! The registry is shared between every per-connection task and the idle
//! sweeper, so all of its state sits behind a `tokio::sync::RwLock`.
//!
//! - `dispatch` takes the **read** lock only long enough to copy the list of
//!   recipients (cheap `Arc` clones), then releases it before any network
//!   write happens.  A slow recipient therefore never holds the lock.
//! - `admit` and `evict` take the **write** lock for a single map insert or
//!   remove.  Closing the evicted session happens after the lock is released.
//!
//! Eviction is idempotent: the session is removed from the map exactly once,
//! and only the caller that performed the removal closes it.  A dispatch
//! failure, the idle sweeper, and the session's own read loop can all race to
//! evict the same session without double-closing it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use clicksync_core::{HotkeyAdvert, RelayEvent, TransportError};
use futures_util::future::join_all;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Opaque identifier assigned to a session when it is admitted.
pub type SessionId = Uuid;

/// Outbound half of a client connection, as seen by the registry.
///
/// Implementations must enforce their own write deadline: `send` returns
/// [`TransportError::Timeout`] rather than blocking indefinitely.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// Writes one event to the client.
    async fn send(&self, event: &RelayEvent) -> Result<(), TransportError>;

    /// Closes the connection.  Called at most once per session by the
    /// registry; implementations should tolerate extra calls anyway.
    async fn close(&self);
}

/// Outcome of a single [`SessionRegistry::dispatch`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sessions the relayed event was written to.
    pub delivered: Vec<SessionId>,
    /// Sessions whose write failed and that this call evicted.
    pub evicted: Vec<SessionId>,
}

struct SessionEntry {
    id: SessionId,
    sink: Arc<dyn SessionSink>,
    last_activity: Mutex<Instant>,
    hotkeys: Mutex<HashMap<String, String>>,
}

impl SessionEntry {
    fn last_activity(&self) -> Instant {
        *self.last_activity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of connected sessions.
///
/// Wrap it in an `Arc` and share it with every connection task.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and returns its id.
    ///
    /// The session's activity clock starts now.
    pub async fn admit(&self, sink: Arc<dyn SessionSink>) -> SessionId {
        let id = Uuid::new_v4();
        let entry = Arc::new(SessionEntry {
            id,
            sink,
            last_activity: Mutex::new(Instant::now()),
            hotkeys: Mutex::new(HashMap::new()),
        });
        let count = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(id, entry);
            sessions.len()
        };
        info!(session = %id, sessions = count, "session admitted");
        id
    }

    /// Records inbound activity for `id`.
    ///
    /// Returns `false` if the session is no longer registered.
    pub async fn touch(&self, id: SessionId) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(&id) {
            Some(entry) => {
                *entry.last_activity.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Fans the relayed form of `event` out to every session except `sender`.
    ///
    /// Events that are not relayed (see [`RelayEvent::relayed`]) produce an
    /// empty report.  All writes run concurrently; a recipient that fails is
    /// evicted and does not affect delivery to the others.
    pub async fn dispatch(&self, sender: SessionId, event: &RelayEvent) -> DispatchReport {
        let Some(outbound) = event.relayed() else {
            return DispatchReport::default();
        };

        let recipients: Vec<Arc<SessionEntry>> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|entry| entry.id != sender)
                .cloned()
                .collect()
        };

        let outbound = &outbound;
        let results = join_all(recipients.iter().map(|entry| async move {
            (entry.id, entry.sink.send(outbound).await)
        }))
        .await;

        let mut report = DispatchReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.delivered.push(id),
                Err(e) => {
                    warn!(session = %id, error = %e, "send failed, evicting session");
                    if self.evict(id).await {
                        report.evicted.push(id);
                    }
                }
            }
        }

        debug!(
            from = %sender,
            kind = outbound.type_name(),
            delivered = report.delivered.len(),
            evicted = report.evicted.len(),
            "dispatch complete"
        );
        report
    }

    /// Removes `id` from the registry and closes its connection.
    ///
    /// Returns `true` if this call performed the removal, `false` if the
    /// session was already gone.
    pub async fn evict(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(entry) => {
                entry.sink.close().await;
                info!(session = %id, "session evicted");
                true
            }
            None => false,
        }
    }

    /// Evicts every session whose last inbound activity is older than
    /// `threshold`.  Returns the evicted ids.
    pub async fn sweep_idle(&self, threshold: Duration) -> Vec<SessionId> {
        let now = Instant::now();
        let stale: Vec<SessionId> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|entry| now.duration_since(entry.last_activity()) > threshold)
                .map(|entry| entry.id)
                .collect()
        };

        let mut evicted = Vec::with_capacity(stale.len());
        for id in stale {
            if self.evict(id).await {
                info!(session = %id, "idle session swept");
                evicted.push(id);
            }
        }
        evicted
    }

    /// Spawns a task that calls [`sweep_idle`](Self::sweep_idle) every
    /// `interval` until `cancel` fires.
    pub fn spawn_idle_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        threshold: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = registry.sweep_idle(threshold).await;
                        if !evicted.is_empty() {
                            info!(count = evicted.len(), "idle sweep evicted sessions");
                        }
                    }
                }
            }
            debug!("idle sweeper stopped");
        })
    }

    /// Records the hotkey a session advertised.  Purely informational.
    ///
    /// Returns `false` if the session is no longer registered.
    pub async fn update_hotkey(&self, id: SessionId, advert: &HotkeyAdvert) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(&id) {
            Some(entry) => {
                entry
                    .hotkeys
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(advert.action.clone(), advert.key.clone());
                true
            }
            None => false,
        }
    }

    /// Returns the action → key map a session last advertised.
    pub async fn hotkeys(&self, id: SessionId) -> Option<HashMap<String, String>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .map(|entry| entry.hotkeys.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Evicts every session.  Used on relay shutdown.
    pub async fn close_all(&self) {
        let ids: Vec<SessionId> = self.sessions.read().await.keys().copied().collect();
        for id in ids {
            self.evict(id).await;
        }
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Returns `true` if `id` is registered.
    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Snapshot of all registered ids.
    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clicksync_core::NormalizedPoint;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── Test double ───────────────────────────────────────────────────────────

    /// Records every event sent to it; optionally fails every send.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<RelayEvent>>,
        close_calls: AtomicUsize,
        should_fail: bool,
    }

    impl RecordingSink {
        fn failing() -> Self {
            Self {
                should_fail: true,
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<RelayEvent> {
            self.sent.lock().unwrap().clone()
        }

        fn close_calls(&self) -> usize {
            self.close_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionSink for RecordingSink {
        async fn send(&self, event: &RelayEvent) -> Result<(), TransportError> {
            if self.should_fail {
                return Err(TransportError::Timeout);
            }
            self.sent.lock().unwrap().push(event.clone());
            Ok(())
        }

        async fn close(&self) {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn click(x: f64, y: f64) -> RelayEvent {
        RelayEvent::SyncClick(NormalizedPoint::new(x, y).unwrap())
    }

    fn execute(x: f64, y: f64) -> RelayEvent {
        RelayEvent::ExecuteClick(NormalizedPoint::new(x, y).unwrap())
    }

    // ── admit / evict ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_admit_assigns_unique_ids() {
        let registry = SessionRegistry::new();
        let a = registry.admit(Arc::new(RecordingSink::default())).await;
        let b = registry.admit(Arc::new(RecordingSink::default())).await;

        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
        assert!(registry.contains(a).await);
        assert!(registry.contains(b).await);
    }

    #[tokio::test]
    async fn test_evict_closes_once_and_is_idempotent() {
        // Arrange
        let registry = SessionRegistry::new();
        let sink = Arc::new(RecordingSink::default());
        let id = registry.admit(sink.clone()).await;

        // Act
        let first = registry.evict(id).await;
        let second = registry.evict(id).await;

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(sink.close_calls(), 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_evictions_close_exactly_once() {
        let registry = Arc::new(SessionRegistry::new());
        let sink = Arc::new(RecordingSink::default());
        let id = registry.admit(sink.clone()).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&registry);
                tokio::spawn(async move { r.evict(id).await })
            })
            .collect();
        let mut removed = 0;
        for h in handles {
            if h.await.unwrap() {
                removed += 1;
            }
        }

        assert_eq!(removed, 1);
        assert_eq!(sink.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_registered_set_tracks_admit_evict_sequence() {
        // Drive a deterministic pseudo-random admit/evict sequence and check
        // after every step that the registry holds exactly the live sessions.
        let registry = SessionRegistry::new();
        let mut live: Vec<SessionId> = Vec::new();
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;

        for _ in 0..200 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            if live.is_empty() || seed % 3 != 0 {
                live.push(registry.admit(Arc::new(RecordingSink::default())).await);
            } else {
                let idx = (seed as usize / 3) % live.len();
                let id = live.swap_remove(idx);
                assert!(registry.evict(id).await);
            }

            let mut expected = live.clone();
            let mut actual = registry.session_ids().await;
            expected.sort();
            actual.sort();
            assert_eq!(expected, actual);
        }
    }

    // ── dispatch ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_dispatch_excludes_sender() {
        // Arrange
        let registry = SessionRegistry::new();
        let a_sink = Arc::new(RecordingSink::default());
        let b_sink = Arc::new(RecordingSink::default());
        let c_sink = Arc::new(RecordingSink::default());
        let a = registry.admit(a_sink.clone()).await;
        let b = registry.admit(b_sink.clone()).await;
        let c = registry.admit(c_sink.clone()).await;

        // Act
        let report = registry.dispatch(a, &click(0.25, 0.75)).await;

        // Assert
        assert!(a_sink.sent().is_empty());
        assert_eq!(b_sink.sent(), vec![execute(0.25, 0.75)]);
        assert_eq!(c_sink.sent(), vec![execute(0.25, 0.75)]);
        let mut delivered = report.delivered.clone();
        delivered.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(delivered, expected);
        assert!(report.evicted.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_with_single_session_delivers_nothing() {
        let registry = SessionRegistry::new();
        let sink = Arc::new(RecordingSink::default());
        let a = registry.admit(sink.clone()).await;

        let report = registry.dispatch(a, &click(0.5, 0.5)).await;

        assert_eq!(report, DispatchReport::default());
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_evicts_only_the_failing_recipient() {
        // Arrange
        let registry = SessionRegistry::new();
        let healthy = Arc::new(RecordingSink::default());
        let broken = Arc::new(RecordingSink::failing());
        let sender = registry.admit(Arc::new(RecordingSink::default())).await;
        let healthy_id = registry.admit(healthy.clone()).await;
        let broken_id = registry.admit(broken.clone()).await;

        // Act
        let report = registry.dispatch(sender, &click(0.1, 0.9)).await;

        // Assert
        assert_eq!(report.delivered, vec![healthy_id]);
        assert_eq!(report.evicted, vec![broken_id]);
        assert_eq!(healthy.sent(), vec![execute(0.1, 0.9)]);
        assert_eq!(broken.close_calls(), 1);
        assert!(!registry.contains(broken_id).await);
        assert!(registry.contains(sender).await);
    }

    #[tokio::test]
    async fn test_dispatch_ignores_events_that_are_not_relayed() {
        let registry = SessionRegistry::new();
        let a = registry.admit(Arc::new(RecordingSink::default())).await;
        let b_sink = Arc::new(RecordingSink::default());
        registry.admit(b_sink.clone()).await;

        let report = registry.dispatch(a, &RelayEvent::Ping).await;
        let report2 = registry.dispatch(a, &execute(0.5, 0.5)).await;

        assert_eq!(report, DispatchReport::default());
        assert_eq!(report2, DispatchReport::default());
        assert!(b_sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_from_unknown_sender_reaches_everyone() {
        let registry = SessionRegistry::new();
        let sink = Arc::new(RecordingSink::default());
        registry.admit(sink.clone()).await;

        registry.dispatch(Uuid::new_v4(), &click(0.0, 1.0)).await;

        assert_eq!(sink.sent(), vec![execute(0.0, 1.0)]);
    }

    // ── idle sweep ────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_sessions_past_threshold() {
        // Arrange
        let registry = SessionRegistry::new();
        let idle_sink = Arc::new(RecordingSink::default());
        let idle = registry.admit(idle_sink.clone()).await;
        let active = registry.admit(Arc::new(RecordingSink::default())).await;

        // Act: 121 s pass, but only `active` pings at t = 100 s.
        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(registry.touch(active).await);
        tokio::time::advance(Duration::from_secs(21)).await;
        let evicted = registry.sweep_idle(Duration::from_secs(120)).await;

        // Assert
        assert_eq!(evicted, vec![idle]);
        assert_eq!(idle_sink.close_calls(), 1);
        assert!(registry.contains(active).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_session_exactly_at_threshold() {
        let registry = SessionRegistry::new();
        let id = registry.admit(Arc::new(RecordingSink::default())).await;

        tokio::time::advance(Duration::from_secs(120)).await;

        assert!(registry.sweep_idle(Duration::from_secs(120)).await.is_empty());
        assert!(registry.contains(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sweeper_task_evicts_and_stops_on_cancel() {
        // Arrange
        let registry = Arc::new(SessionRegistry::new());
        let id = registry.admit(Arc::new(RecordingSink::default())).await;
        let cancel = CancellationToken::new();
        let handle = registry.spawn_idle_sweeper(
            Duration::from_secs(60),
            Duration::from_secs(120),
            cancel.clone(),
        );

        // Act: the sweep at t = 180 s sees 180 s of silence.
        tokio::time::sleep(Duration::from_secs(181)).await;

        // Assert
        assert!(!registry.contains(id).await);
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_touch_unknown_session_returns_false() {
        let registry = SessionRegistry::new();
        assert!(!registry.touch(Uuid::new_v4()).await);
    }

    // ── hotkeys ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_update_hotkey_is_recorded_per_session() {
        let registry = SessionRegistry::new();
        let id = registry.admit(Arc::new(RecordingSink::default())).await;
        let advert = HotkeyAdvert {
            action: "sync_click".to_string(),
            key: "f6".to_string(),
        };

        assert!(registry.update_hotkey(id, &advert).await);

        let map = registry.hotkeys(id).await.unwrap();
        assert_eq!(map.get("sync_click").map(String::as_str), Some("f6"));
    }

    #[tokio::test]
    async fn test_close_all_empties_registry() {
        let registry = SessionRegistry::new();
        let sink = Arc::new(RecordingSink::default());
        registry.admit(sink.clone()).await;
        registry.admit(Arc::new(RecordingSink::default())).await;

        registry.close_all().await;

        assert!(registry.is_empty().await);
        assert_eq!(sink.close_calls(), 1);
    }
}
