//! Mock global hotkey watcher for testing.
//!
//! `MockHotkeyWatcher` never touches the OS.  Tests inject key presses with
//! [`MockHotkeyWatcher::press`] and inspect how the lifecycle used the
//! watcher: which codes were watched, how many hooks are installed right now,
//! and the largest number ever installed at once.
//!
//! # `should_fail` flag
//!
//! When set, every `watch` call returns `PlatformError::HotkeyUnavailable`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use clicksync_core::{HotkeyLabel, KeyMapper};
use tokio::sync::mpsc;

use crate::application::hotkey_watch::{GlobalHotkeyWatcher, HotkeyPress};
use crate::application::replay_click::PlatformError;

#[derive(Default)]
struct Inner {
    sender: Option<mpsc::Sender<HotkeyPress>>,
    active: usize,
    max_active: usize,
    watched: Vec<u32>,
    unwatch_calls: usize,
}

/// A watcher that records calls and lets tests inject presses.
#[derive(Default)]
pub struct MockHotkeyWatcher {
    inner: Mutex<Inner>,
    /// When `true`, `watch` fails.
    pub should_fail: bool,
}

impl MockHotkeyWatcher {
    /// Creates a watcher that accepts every `watch` call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a watcher whose `watch` always fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers a press to the installed hook.  Returns `false` if no hook is
    /// installed or its channel is full.
    pub fn press(&self, native_code: u32) -> bool {
        let sender = self.inner().sender.clone();
        match sender {
            Some(tx) => tx.try_send(HotkeyPress { native_code }).is_ok(),
            None => false,
        }
    }

    /// Presses `label` using the running platform's key table.
    pub fn press_label(&self, label: HotkeyLabel) -> bool {
        KeyMapper::native_code_for_current(label).is_some_and(|code| self.press(code))
    }

    /// Number of hooks installed right now.
    pub fn active_count(&self) -> usize {
        self.inner().active
    }

    /// Largest number of hooks ever installed at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.inner().max_active
    }

    /// Codes passed to `watch`, in call order.
    pub fn watched_codes(&self) -> Vec<u32> {
        self.inner().watched.clone()
    }

    /// Number of `unwatch` calls.
    pub fn unwatch_calls(&self) -> usize {
        self.inner().unwatch_calls
    }
}

impl GlobalHotkeyWatcher for MockHotkeyWatcher {
    fn watch(&self, native_code: u32) -> Result<mpsc::Receiver<HotkeyPress>, PlatformError> {
        if self.should_fail {
            return Err(PlatformError::HotkeyUnavailable("mock failure".into()));
        }
        let (tx, rx) = mpsc::channel(16);
        let mut inner = self.inner();
        inner.sender = Some(tx);
        inner.active += 1;
        inner.max_active = inner.max_active.max(inner.active);
        inner.watched.push(native_code);
        Ok(rx)
    }

    fn unwatch(&self) {
        let mut inner = self.inner();
        inner.sender = None;
        inner.active = inner.active.saturating_sub(1);
        inner.unwatch_calls += 1;
    }
}
