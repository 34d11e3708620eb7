//! Recording input driver for testing.
//!
//! Every call is pushed into a `Mutex<Vec<...>>` so that tests can assert
//! exactly which clicks happened and in what order.  The screen size and
//! cursor position are fixed at construction.
//!
//! # `should_fail` flag
//!
//! When set, `click` and `move_and_click` return
//! `PlatformError::InputDriverFailure`.  Screen and cursor queries still
//! succeed, so callers get as far as the click itself.

use std::sync::{Mutex, PoisonError};

use crate::application::replay_click::{LocalInputDriver, PlatformError};

/// A driver that records clicks without performing OS calls.
pub struct RecordingInputDriver {
    /// One entry per `click` call: the cursor position at the time.
    pub clicks: Mutex<Vec<(i32, i32)>>,
    /// One entry per `move_and_click` call.
    pub moved_clicks: Mutex<Vec<(i32, i32)>>,
    screen: (u32, u32),
    cursor: (i32, i32),
    /// When `true`, click methods fail.
    pub should_fail: bool,
}

impl RecordingInputDriver {
    /// Creates a driver for a `width`×`height` screen with the cursor at
    /// `cursor`.
    pub fn new(width: u32, height: u32, cursor: (i32, i32)) -> Self {
        Self {
            clicks: Mutex::new(Vec::new()),
            moved_clicks: Mutex::new(Vec::new()),
            screen: (width, height),
            cursor,
            should_fail: false,
        }
    }

    /// Same as [`new`](Self::new) but every click fails.
    pub fn failing(width: u32, height: u32, cursor: (i32, i32)) -> Self {
        Self {
            should_fail: true,
            ..Self::new(width, height, cursor)
        }
    }

    /// Snapshot of the local clicks.
    pub fn clicks(&self) -> Vec<(i32, i32)> {
        self.clicks.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Snapshot of the replayed clicks.
    pub fn moved_clicks(&self) -> Vec<(i32, i32)> {
        self.moved_clicks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LocalInputDriver for RecordingInputDriver {
    fn click(&self) -> Result<(), PlatformError> {
        if self.should_fail {
            return Err(PlatformError::InputDriverFailure("mock failure".into()));
        }
        self.clicks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.cursor);
        Ok(())
    }

    fn move_and_click(&self, x: i32, y: i32) -> Result<(), PlatformError> {
        if self.should_fail {
            return Err(PlatformError::InputDriverFailure("mock failure".into()));
        }
        self.moved_clicks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((x, y));
        Ok(())
    }

    fn screen_size(&self) -> Result<(u32, u32), PlatformError> {
        Ok(self.screen)
    }

    fn cursor_position(&self) -> Result<(i32, i32), PlatformError> {
        Ok(self.cursor)
    }
}
