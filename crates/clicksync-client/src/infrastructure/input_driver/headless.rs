//! Headless input driver: a virtual screen with a virtual cursor.
//!
//! Clicks are logged at `info` instead of being injected into the OS, which
//! makes the client usable on servers and in CI, and makes the relay's
//! coordinate scaling visible in the log.

use std::sync::{Mutex, PoisonError};

use tracing::info;

use crate::application::replay_click::{LocalInputDriver, PlatformError};

/// Input driver backed by a virtual screen.
pub struct VirtualScreenDriver {
    width: u32,
    height: u32,
    cursor: Mutex<(i32, i32)>,
}

impl VirtualScreenDriver {
    /// Creates a `width`×`height` screen with the cursor at its centre.
    pub fn new(width: u32, height: u32) -> Self {
        let centre = ((width / 2) as i32, (height / 2) as i32);
        Self {
            width,
            height,
            cursor: Mutex::new(centre),
        }
    }

    /// Moves the virtual cursor, clamped to the screen.
    pub fn set_cursor(&self, x: i32, y: i32) -> (i32, i32) {
        let max_x = self.width.saturating_sub(1) as i32;
        let max_y = self.height.saturating_sub(1) as i32;
        let pos = (x.clamp(0, max_x), y.clamp(0, max_y));
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner) = pos;
        pos
    }
}

impl LocalInputDriver for VirtualScreenDriver {
    fn click(&self) -> Result<(), PlatformError> {
        let (x, y) = self.cursor_position()?;
        info!("click at ({x}, {y})");
        Ok(())
    }

    fn move_and_click(&self, x: i32, y: i32) -> Result<(), PlatformError> {
        let (x, y) = self.set_cursor(x, y);
        info!("remote click replayed at ({x}, {y})");
        Ok(())
    }

    fn screen_size(&self) -> Result<(u32, u32), PlatformError> {
        Ok((self.width, self.height))
    }

    fn cursor_position(&self) -> Result<(i32, i32), PlatformError> {
        Ok(*self.cursor.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_starts_at_centre() {
        let driver = VirtualScreenDriver::new(1920, 1080);
        assert_eq!(driver.cursor_position().unwrap(), (960, 540));
    }

    #[test]
    fn test_move_and_click_moves_cursor() {
        let driver = VirtualScreenDriver::new(1920, 1080);
        driver.move_and_click(10, 20).unwrap();
        assert_eq!(driver.cursor_position().unwrap(), (10, 20));
    }

    #[test]
    fn test_set_cursor_is_clamped_to_screen() {
        let driver = VirtualScreenDriver::new(800, 600);
        assert_eq!(driver.set_cursor(5000, -3), (799, 0));
    }

    #[test]
    fn test_screen_size_reports_configured_size() {
        let driver = VirtualScreenDriver::new(2560, 1440);
        assert_eq!(driver.screen_size().unwrap(), (2560, 1440));
    }
}
