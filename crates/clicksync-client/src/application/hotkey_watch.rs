//! HotkeyWatchLifecycle: owns the single active global hotkey watch.
//!
//! # Lifecycle
//!
//! ```text
//! start(F5) ──► watcher.watch(code(F5)) ──► watch task (generation 1)
//! start(F6) ──► cancel gen 1, await its task (it calls watcher.unwatch())
//!           ──► watcher.watch(code(F6)) ──► watch task (generation 2)
//! stop(handle gen 1) ──► no-op (stale)
//! stop(handle gen 2) ──► cancel gen 2, await its task
//! ```
//!
//! `start` holds the lifecycle lock from stopping the old watch until the new
//! one is recorded, so no two watches are ever active at the same time.
//!
//! # Firing policy
//!
//! The watch task forwards a press as a [`HotkeyTrigger`] only when its
//! native key code equals the code of the configured label on the running
//! platform.  Every other press is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clicksync_core::{HotkeyLabel, KeyMapper, PlatformFamily};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::replay_click::PlatformError;

/// A key press reported by the platform watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyPress {
    /// Platform-native key code (VK, keysym, or CGKeyCode).
    pub native_code: u32,
}

/// A press of the configured hotkey, forwarded to the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyTrigger {
    pub label: HotkeyLabel,
    pub generation: u64,
}

/// Platform global-hotkey hook.
///
/// `watch` installs a hook and returns a channel of presses; `unwatch`
/// removes it.  The lifecycle guarantees at most one watch is installed at a
/// time and always pairs `watch` with exactly one `unwatch`.
pub trait GlobalHotkeyWatcher: Send + Sync {
    /// Installs a hook for `native_code`.
    ///
    /// Implementations may deliver presses of other keys too; the lifecycle
    /// filters them out.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::HotkeyUnavailable`] if the hook cannot be
    /// installed.
    fn watch(&self, native_code: u32) -> Result<mpsc::Receiver<HotkeyPress>, PlatformError>;

    /// Removes the hook installed by the last `watch`.
    fn unwatch(&self);
}

/// Identifies one started watch.  Stopping a stale handle does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchHandle {
    generation: u64,
    label: HotkeyLabel,
}

impl WatchHandle {
    /// Generation number of this watch; strictly increasing per lifecycle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The hotkey this watch fires on.
    pub fn label(&self) -> HotkeyLabel {
        self.label
    }
}

struct ActiveWatch {
    handle: WatchHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owner of the single active hotkey watch.
pub struct HotkeyWatchLifecycle {
    watcher: Arc<dyn GlobalHotkeyWatcher>,
    family: PlatformFamily,
    triggers: mpsc::Sender<HotkeyTrigger>,
    active: Mutex<Option<ActiveWatch>>,
    generation: AtomicU64,
}

impl HotkeyWatchLifecycle {
    /// Creates a lifecycle for the running platform.  Triggers are delivered
    /// on `triggers`.
    pub fn new(watcher: Arc<dyn GlobalHotkeyWatcher>, triggers: mpsc::Sender<HotkeyTrigger>) -> Self {
        Self::for_family(watcher, PlatformFamily::current(), triggers)
    }

    /// Creates a lifecycle that maps labels with another platform's key table.
    pub fn for_family(
        watcher: Arc<dyn GlobalHotkeyWatcher>,
        family: PlatformFamily,
        triggers: mpsc::Sender<HotkeyTrigger>,
    ) -> Self {
        Self {
            watcher,
            family,
            triggers,
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Stops any active watch, waits for it to exit, then starts watching
    /// `label`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::UnsupportedKey`] if `label` has no code on
    /// this platform, or the watcher's error if the hook cannot be installed.
    /// The previous watch is stopped in either case.
    pub async fn start(&self, label: HotkeyLabel) -> Result<WatchHandle, PlatformError> {
        let native_code = KeyMapper::native_code(label, self.family)
            .ok_or_else(|| PlatformError::UnsupportedKey(label.to_string()))?;

        let mut slot = self.active.lock().await;
        if let Some(previous) = slot.take() {
            shutdown(previous).await;
        }

        let presses = self.watcher.watch(native_code)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = WatchHandle { generation, label };
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_watch(
            presses,
            native_code,
            handle,
            cancel.clone(),
            self.triggers.clone(),
            Arc::clone(&self.watcher),
        ));

        info!(key = %label, native_code, generation, "hotkey watch started");
        *slot = Some(ActiveWatch {
            handle,
            cancel,
            task,
        });
        Ok(handle)
    }

    /// Stops the watch identified by `handle` if it is still the active one.
    ///
    /// Returns `true` if a watch was stopped.
    pub async fn stop(&self, handle: &WatchHandle) -> bool {
        let mut slot = self.active.lock().await;
        match slot.as_ref() {
            Some(active) if active.handle.generation == handle.generation => {}
            _ => return false,
        }
        if let Some(active) = slot.take() {
            shutdown(active).await;
        }
        true
    }

    /// Stops whichever watch is active.  Returns `true` if one was.
    pub async fn stop_current(&self) -> bool {
        let mut slot = self.active.lock().await;
        match slot.take() {
            Some(active) => {
                shutdown(active).await;
                true
            }
            None => false,
        }
    }

    /// Returns `true` while a watch is installed and its task is running.
    pub async fn is_active(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(|a| !a.task.is_finished())
    }

    /// The handle of the active watch, if any.
    pub async fn current(&self) -> Option<WatchHandle> {
        self.active.lock().await.as_ref().map(|a| a.handle)
    }
}

/// Cancels a watch and waits until its task (and thus `unwatch`) has run.
async fn shutdown(active: ActiveWatch) {
    active.cancel.cancel();
    if let Err(e) = active.task.await {
        warn!(generation = active.handle.generation, "hotkey watch task failed: {e}");
    }
    debug!(generation = active.handle.generation, "hotkey watch stopped");
}

async fn run_watch(
    mut presses: mpsc::Receiver<HotkeyPress>,
    native_code: u32,
    handle: WatchHandle,
    cancel: CancellationToken,
    triggers: mpsc::Sender<HotkeyTrigger>,
    watcher: Arc<dyn GlobalHotkeyWatcher>,
) {
    loop {
        let press = tokio::select! {
            _ = cancel.cancelled() => break,
            press = presses.recv() => press,
        };
        match press {
            Some(p) if p.native_code == native_code => {
                let trigger = HotkeyTrigger {
                    label: handle.label,
                    generation: handle.generation,
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = triggers.send(trigger) => {
                        if sent.is_err() {
                            debug!("trigger receiver dropped; ending hotkey watch");
                            break;
                        }
                    }
                }
            }
            Some(p) => debug!(native_code = p.native_code, "ignoring non-hotkey press"),
            None => {
                warn!(generation = handle.generation, "hotkey watcher channel closed");
                break;
            }
        }
    }
    watcher.unwatch();
}

// ── Tests ─────────────────────────────────────────────────────────────────────
