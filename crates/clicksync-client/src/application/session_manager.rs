//! ClientSessionManager: the client's connection state machine.
//!
//! # States
//!
//! ```text
//!            ┌──────────────── backoff / retry_now ────────────────┐
//!            ▼                                                      │
//!   Disconnected ──► Connecting ──► Connected ──(read/write/ping)──► Disconnected
//!                        │                         failure
//!                        └──────(connect failed)─────────────────────┘
//! ```
//!
//! A single supervisor task ([`ClientSessionManager::run`]) owns the loop, so
//! only one connection attempt is ever in flight.  Every connection gets an
//! epoch number; failure reports carry the epoch they observed and are
//! ignored once that connection is already gone.
//!
//! # Shared state
//!
//! Everything the tasks share lives in one `std::sync::Mutex<ClientState>`.
//! The lock is never held across an `.await` or a platform call.  Installing
//! the transport on connect and reading it on a hotkey trigger both go
//! through that lock.  A trigger is bound to the connection that was live
//! when it was pressed and is never sent on a later one.
//!
//! # Tasks while connected
//!
//! - read loop: `execute_click` is replayed on the blocking pool
//! - ping loop: one liveness probe per `ping_interval`
//! - hotkey watch (owned by [`HotkeyWatchLifecycle`])
//!
//! The trigger loop runs for the whole lifetime of the manager.  It drops
//! triggers that arrive while disconnected and triggers left in the queue by
//! a watch that has since been stopped.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clicksync_core::{HotkeyAdvert, HotkeyLabel, KeyMapper, NormalizedPoint, RelayEvent};
use futures_util::FutureExt;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::backoff::Backoff;
use crate::application::hotkey_watch::{GlobalHotkeyWatcher, HotkeyTrigger, HotkeyWatchLifecycle};
use crate::application::replay_click::{LocalInputDriver, PlatformError, ReplayClickUseCase};
use crate::application::transport::{Connector, Transport};
use crate::domain::SessionSettings;

/// Action name sent with every hotkey advert.
const SYNC_CLICK_ACTION: &str = "sync_click";

/// Capacity of the hotkey trigger channel.
const TRIGGER_QUEUE: usize = 16;

// ── Public types ──────────────────────────────────────────────────────────────

/// Connection state published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(text)
    }
}

/// What happened to one hotkey trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerOutcome {
    /// Not connected; nothing was sent.
    Dropped,
    /// The click position was sent to the relay.
    Sent(NormalizedPoint),
    /// The cursor could not be read or the send failed.
    Failed,
}

// ── Shared state ──────────────────────────────────────────────────────────────

struct ClientState {
    transport: Option<Arc<dyn Transport>>,
    phase: ConnectionState,
    epoch: u64,
    hotkey: HotkeyLabel,
    usable: bool,
    conn_cancel: Option<CancellationToken>,
}

/// The client's connection state machine.  Create with
/// [`new`](Self::new), drive with [`run`](Self::run).
pub struct ClientSessionManager {
    settings: SessionSettings,
    connector: Arc<dyn Connector>,
    replay: Arc<ReplayClickUseCase>,
    hotkey_watch: HotkeyWatchLifecycle,
    triggers: Mutex<Option<mpsc::Receiver<HotkeyTrigger>>>,
    state: Mutex<ClientState>,
    status: watch::Sender<ConnectionState>,
    // Serialises watch restarts between the supervisor and `set_hotkey`.
    watch_sync: tokio::sync::Mutex<()>,
    retry: Notify,
    shutdown: CancellationToken,
}

impl ClientSessionManager {
    /// Builds a manager in the `Disconnected` state.  Nothing happens until
    /// [`run`](Self::run) is spawned.
    pub fn new(
        settings: SessionSettings,
        connector: Arc<dyn Connector>,
        driver: Arc<dyn LocalInputDriver>,
        watcher: Arc<dyn GlobalHotkeyWatcher>,
        hotkey: HotkeyLabel,
    ) -> Arc<Self> {
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE);
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            settings,
            connector,
            replay: Arc::new(ReplayClickUseCase::new(driver)),
            hotkey_watch: HotkeyWatchLifecycle::new(watcher, trigger_tx),
            triggers: Mutex::new(Some(trigger_rx)),
            state: Mutex::new(ClientState {
                transport: None,
                phase: ConnectionState::Disconnected,
                epoch: 0,
                hotkey,
                usable: false,
                conn_cancel: None,
            }),
            status,
            watch_sync: tokio::sync::Mutex::new(()),
            retry: Notify::new(),
            shutdown: CancellationToken::new(),
        })
    }

    // ── Observation ───────────────────────────────────────────────────────────

    /// Subscribes to connection state changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.lock_state().phase
    }

    /// Currently configured hotkey.
    pub fn hotkey(&self) -> HotkeyLabel {
        self.lock_state().hotkey
    }

    /// `true` while a connection is installed and triggers are sent.
    pub fn is_usable(&self) -> bool {
        self.lock_state().usable
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Changes the hotkey.  While connected the active watch is replaced and
    /// the new binding is advertised to the relay.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::UnsupportedKey`] if `label` has no native code
    /// on this platform (the hotkey is left unchanged), or the watcher's error
    /// if the new hook cannot be installed.
    pub async fn set_hotkey(&self, label: HotkeyLabel) -> Result<(), PlatformError> {
        if KeyMapper::native_code_for_current(label).is_none() {
            return Err(PlatformError::UnsupportedKey(label.to_string()));
        }

        let previous = std::mem::replace(&mut self.lock_state().hotkey, label);
        if previous == label {
            return Ok(());
        }
        info!("hotkey changed from {previous} to {label}");

        self.sync_watch().await?;
        if let Some((transport, epoch)) = self.current_transport() {
            self.advertise_hotkey(transport.as_ref(), epoch, label).await;
        }
        Ok(())
    }

    /// Cuts the current reconnect delay short.  Returns `false` (and does
    /// nothing) while connected.
    pub fn retry_now(&self) -> bool {
        if self.state() == ConnectionState::Connected {
            return false;
        }
        self.retry.notify_one();
        true
    }

    /// Stops the supervisor, the connection and the hotkey watch.
    /// [`run`](Self::run) returns once teardown is complete.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Handles one press of the configured hotkey: clicks locally (if
    /// enabled), then sends the cursor position to the relay.
    ///
    /// A press while not connected is dropped, never queued.  The click is
    /// sent only on the connection that was live when the key was pressed;
    /// if that connection is gone once the position is captured, the press
    /// is dropped.
    pub async fn handle_trigger(&self) -> TriggerOutcome {
        let Some((transport, epoch)) = self.current_transport() else {
            debug!("hotkey pressed while not connected; ignored");
            return TriggerOutcome::Dropped;
        };

        let replay = Arc::clone(&self.replay);
        let click_locally = self.settings.click_locally;
        let captured = tokio::task::spawn_blocking(move || {
            if click_locally {
                if let Err(e) = replay.click_here() {
                    warn!("local click failed: {e}");
                }
            }
            replay.capture_trigger_point()
        })
        .await;

        let point = match captured {
            Ok(Ok(point)) => point,
            Ok(Err(e)) => {
                warn!("could not read the trigger position: {e}");
                return TriggerOutcome::Failed;
            }
            Err(e) => {
                error!("trigger capture task failed: {e}");
                return TriggerOutcome::Failed;
            }
        };

        if !self.is_current(epoch) {
            debug!(epoch, "connection changed while capturing the trigger; click not sent");
            return TriggerOutcome::Dropped;
        }

        match transport.send(&RelayEvent::SyncClick(point)).await {
            Ok(()) => {
                info!("sent click at ({:.4}, {:.4})", point.x(), point.y());
                TriggerOutcome::Sent(point)
            }
            Err(e) => {
                self.report_failure(epoch, &format!("sending sync_click failed: {e}"));
                TriggerOutcome::Failed
            }
        }
    }

    // ── Supervisor ────────────────────────────────────────────────────────────

    /// Runs the connect/serve/reconnect loop until [`shutdown`](Self::shutdown).
    ///
    /// Only the first call does anything; a second concurrent `run` returns
    /// immediately.
    pub async fn run(self: Arc<Self>) {
        let Some(trigger_rx) = self.triggers.lock().unwrap_or_else(PoisonError::into_inner).take()
        else {
            warn!("session manager is already running");
            return;
        };
        let trigger_task = tokio::spawn(Arc::clone(&self).trigger_loop(trigger_rx));

        let mut backoff = Backoff::new(self.settings.reconnect_delay, self.settings.max_reconnect_delay);

        while !self.shutdown.is_cancelled() {
            self.set_phase(ConnectionState::Connecting);

            let attempt = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                attempt = timeout(self.settings.connect_timeout, self.connector.connect()) => attempt,
            };

            match attempt {
                Ok(Ok(transport)) => {
                    backoff.reset();
                    // A retry requested before this connection is stale now.
                    let _ = self.retry.notified().now_or_never();
                    self.serve(transport).await;
                    if self.shutdown.is_cancelled() {
                        break;
                    }
                }
                Ok(Err(e)) => warn!("connection attempt failed: {e}"),
                Err(_) => warn!(
                    "connection attempt timed out after {:?}",
                    self.settings.connect_timeout
                ),
            }

            self.set_phase(ConnectionState::Disconnected);
            let delay = backoff.next_delay();
            info!("reconnecting in {delay:?}");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.retry.notified() => info!("retrying now"),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.stop_watch().await;
        self.set_phase(ConnectionState::Disconnected);
        if let Err(e) = trigger_task.await {
            warn!("trigger task failed: {e}");
        }
        info!("session manager stopped");
    }

    /// Serves one established connection until it fails or shutdown.
    async fn serve(self: &Arc<Self>, transport: Arc<dyn Transport>) {
        let conn_cancel = self.shutdown.child_token();

        // Entry actions, atomic for every observer of `state`.
        let (epoch, label) = {
            let mut st = self.lock_state();
            st.epoch += 1;
            st.transport = Some(Arc::clone(&transport));
            st.usable = true;
            st.conn_cancel = Some(conn_cancel.clone());
            self.publish(&mut st, ConnectionState::Connected);
            (st.epoch, st.hotkey)
        };
        info!(epoch, "connected to relay");

        if let Err(e) = self.sync_watch().await {
            warn!("hotkey {label} is not being watched: {e}");
        }
        self.advertise_hotkey(transport.as_ref(), epoch, self.hotkey()).await;

        let reader = tokio::spawn(Arc::clone(self).read_loop(
            Arc::clone(&transport),
            epoch,
            conn_cancel.clone(),
        ));
        let pinger = tokio::spawn(Arc::clone(self).ping_loop(
            Arc::clone(&transport),
            epoch,
            conn_cancel.clone(),
        ));

        conn_cancel.cancelled().await;

        // Exit actions.  A no-op if a loop already reported the failure.
        self.report_failure(epoch, "session manager shutting down");
        transport.close().await;
        for task in [reader, pinger] {
            if let Err(e) = task.await {
                warn!(epoch, "connection task failed: {e}");
            }
        }
        self.stop_watch().await;
        debug!(epoch, "connection torn down");
    }

    /// Marks connection `epoch` as failed.  Returns `true` if this call
    /// performed the transition; stale or repeated reports return `false`.
    fn report_failure(&self, epoch: u64, reason: &str) -> bool {
        let cancel = {
            let mut st = self.lock_state();
            if st.epoch != epoch || !st.usable {
                return false;
            }
            st.usable = false;
            st.transport = None;
            self.publish(&mut st, ConnectionState::Disconnected);
            st.conn_cancel.take()
        };
        warn!(epoch, "connection lost: {reason}");
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        true
    }

    // ── Connection tasks ──────────────────────────────────────────────────────

    async fn read_loop(
        self: Arc<Self>,
        transport: Arc<dyn Transport>,
        epoch: u64,
        cancel: CancellationToken,
    ) {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => return,
                received = transport.receive() => received,
            };
            match received {
                Ok(RelayEvent::ExecuteClick(point)) => self.spawn_replay(point),
                Ok(RelayEvent::HotkeyUpdate(advert)) => {
                    info!("another client bound {} to {}", advert.action, advert.key);
                }
                Ok(other) => debug!("ignoring {} from relay", other.type_name()),
                Err(e) => {
                    self.report_failure(epoch, &format!("read failed: {e}"));
                    return;
                }
            }
        }
    }

    async fn ping_loop(
        self: Arc<Self>,
        transport: Arc<dyn Transport>,
        epoch: u64,
        cancel: CancellationToken,
    ) {
        // A zero interval disables the keepalive.
        if self.settings.ping_interval.is_zero() {
            cancel.cancelled().await;
            return;
        }
        let mut ticker = tokio::time::interval(self.settings.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            if let Err(e) = transport.ping().await {
                self.report_failure(epoch, &format!("ping failed: {e}"));
                return;
            }
            debug!(epoch, "ping sent");
        }
    }

    async fn trigger_loop(self: Arc<Self>, mut triggers: mpsc::Receiver<HotkeyTrigger>) {
        loop {
            let trigger = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                trigger = triggers.recv() => trigger,
            };
            let Some(trigger) = trigger else { break };
            if trigger.label != self.hotkey() {
                debug!(generation = trigger.generation, "dropping trigger for a replaced hotkey");
                continue;
            }
            // Waits for a restart in progress, so a trigger from the new
            // watch is compared against the new generation.
            let active = self.hotkey_watch.current().await.map(|h| h.generation());
            if active != Some(trigger.generation) {
                debug!(
                    generation = trigger.generation,
                    ?active,
                    "dropping trigger from a stopped hotkey watch"
                );
                continue;
            }
            self.handle_trigger().await;
        }
    }

    fn spawn_replay(&self, point: NormalizedPoint) {
        let replay = Arc::clone(&self.replay);
        tokio::task::spawn_blocking(move || match replay.replay(point) {
            Ok((x, y)) => info!("replayed click at ({x}, {y})"),
            Err(e) => warn!("could not replay click: {e}"),
        });
    }

    // ── Hotkey watch ──────────────────────────────────────────────────────────

    /// Brings the active watch in line with the configured hotkey: watching
    /// it while connected, nothing otherwise.
    async fn sync_watch(&self) -> Result<(), PlatformError> {
        let _guard = self.watch_sync.lock().await;
        loop {
            let (label, connected) = {
                let st = self.lock_state();
                (st.hotkey, st.usable)
            };
            if !connected {
                self.hotkey_watch.stop_current().await;
                return Ok(());
            }

            let up_to_date = match self.hotkey_watch.current().await {
                Some(handle) if handle.label() == label => self.hotkey_watch.is_active().await,
                _ => false,
            };
            if !up_to_date {
                self.hotkey_watch.start(label).await?;
            }

            // The label may have changed while the watch was restarting.
            if self.hotkey() == label {
                return Ok(());
            }
        }
    }

    async fn stop_watch(&self) {
        let _guard = self.watch_sync.lock().await;
        self.hotkey_watch.stop_current().await;
    }

    async fn advertise_hotkey(&self, transport: &dyn Transport, epoch: u64, label: HotkeyLabel) {
        let advert = RelayEvent::UpdateHotkey(HotkeyAdvert {
            action: SYNC_CLICK_ACTION.to_string(),
            key: label.as_str().to_string(),
        });
        if let Err(e) = transport.send(&advert).await {
            self.report_failure(epoch, &format!("sending update_hotkey failed: {e}"));
        }
    }

    // ── State helpers ─────────────────────────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_transport(&self) -> Option<(Arc<dyn Transport>, u64)> {
        let st = self.lock_state();
        match (&st.transport, st.usable) {
            (Some(transport), true) => Some((Arc::clone(transport), st.epoch)),
            _ => None,
        }
    }

    /// `true` while connection `epoch` is the installed, usable one.
    fn is_current(&self, epoch: u64) -> bool {
        let st = self.lock_state();
        st.usable && st.epoch == epoch
    }

    fn set_phase(&self, phase: ConnectionState) {
        let mut st = self.lock_state();
        self.publish(&mut st, phase);
    }

    fn publish(&self, st: &mut ClientState, phase: ConnectionState) {
        if st.phase != phase {
            st.phase = phase;
            self.status.send_replace(phase);
            debug!(%phase, "connection state changed");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
