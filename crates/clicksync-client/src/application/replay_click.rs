//! ReplayClickUseCase: turns relay instructions into local clicks and local
//! hotkey presses into normalized click positions.
//!
//! This use case sits at the application layer and delegates to a
//! [`LocalInputDriver`] trait object for the actual OS calls.  Every driver
//! method is blocking; the session manager calls this use case from
//! `tokio::task::spawn_blocking`.

use std::sync::Arc;

use clicksync_core::NormalizedPoint;
use thiserror::Error;
use tracing::debug;

/// Errors reported by platform collaborators (input driver, hotkey watcher).
///
/// A platform error is logged and isolated to the call that produced it; it
/// never changes the connection state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The OS refused or failed a synthetic input call.
    #[error("input driver failure: {0}")]
    InputDriverFailure(String),

    /// The global hotkey could not be registered (already grabbed, no
    /// permission, no display).
    #[error("hotkey unavailable: {0}")]
    HotkeyUnavailable(String),

    /// The key has no native code on this platform.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),
}

/// Synthetic mouse input on the local machine.
///
/// Implementations are blocking and must be callable from any thread.
#[cfg_attr(test, mockall::automock)]
pub trait LocalInputDriver: Send + Sync {
    /// Left-clicks at the current cursor position.
    fn click(&self) -> Result<(), PlatformError>;

    /// Moves the cursor to `(x, y)` in pixels and left-clicks there.
    fn move_and_click(&self, x: i32, y: i32) -> Result<(), PlatformError>;

    /// Size of the primary screen in pixels.
    fn screen_size(&self) -> Result<(u32, u32), PlatformError>;

    /// Current cursor position in pixels.
    fn cursor_position(&self) -> Result<(i32, i32), PlatformError>;
}

/// The replay-click use case.
pub struct ReplayClickUseCase {
    driver: Arc<dyn LocalInputDriver>,
}

impl ReplayClickUseCase {
    /// Creates the use case around a platform driver.
    pub fn new(driver: Arc<dyn LocalInputDriver>) -> Self {
        Self { driver }
    }

    /// Replays a click from another machine at the same relative position on
    /// this screen.  Returns the pixel position that was clicked.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InputDriverFailure`] if the screen size is
    /// unavailable or zero, or the click itself fails.
    pub fn replay(&self, point: NormalizedPoint) -> Result<(i32, i32), PlatformError> {
        let (width, height) = self.driver.screen_size()?;
        if width == 0 || height == 0 {
            return Err(PlatformError::InputDriverFailure(format!(
                "screen size is {width}x{height}"
            )));
        }
        let (x, y) = point.to_pixels(width, height);
        debug!(
            "replaying click at ({x}, {y}) on {width}x{height} from ({:.4}, {:.4})",
            point.x(),
            point.y()
        );
        self.driver.move_and_click(x, y)?;
        Ok((x, y))
    }

    /// Normalizes the current cursor position against the screen size.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InputDriverFailure`] if the cursor or screen
    /// size cannot be read, or the cursor lies outside the primary screen.
    pub fn capture_trigger_point(&self) -> Result<NormalizedPoint, PlatformError> {
        let (x, y) = self.driver.cursor_position()?;
        let (width, height) = self.driver.screen_size()?;
        NormalizedPoint::from_pixels(x, y, width, height)
            .map_err(|e| PlatformError::InputDriverFailure(format!("cursor ({x}, {y}): {e}")))
    }

    /// Left-clicks at the current cursor position.
    ///
    /// # Errors
    ///
    /// Propagates the driver's error.
    pub fn click_here(&self) -> Result<(), PlatformError> {
        self.driver.click()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn point(x: f64, y: f64) -> NormalizedPoint {
        NormalizedPoint::new(x, y).unwrap()
    }

    #[test]
    fn test_replay_scales_to_local_screen() {
        // Arrange
        let mut driver = MockLocalInputDriver::new();
        driver.expect_screen_size().returning(|| Ok((2560, 1440)));
        driver
            .expect_move_and_click()
            .with(eq(640), eq(1080))
            .times(1)
            .returning(|_, _| Ok(()));
        let use_case = ReplayClickUseCase::new(Arc::new(driver));

        // Act
        let clicked = use_case.replay(point(0.25, 0.75)).unwrap();

        // Assert
        assert_eq!(clicked, (640, 1080));
    }

    #[test]
    fn test_replay_at_one_clicks_last_pixel() {
        let mut driver = MockLocalInputDriver::new();
        driver.expect_screen_size().returning(|| Ok((1920, 1080)));
        driver
            .expect_move_and_click()
            .with(eq(1919), eq(1079))
            .times(1)
            .returning(|_, _| Ok(()));
        let use_case = ReplayClickUseCase::new(Arc::new(driver));

        assert_eq!(use_case.replay(point(1.0, 1.0)).unwrap(), (1919, 1079));
    }

    #[test]
    fn test_replay_zero_screen_is_error_and_does_not_click() {
        let mut driver = MockLocalInputDriver::new();
        driver.expect_screen_size().returning(|| Ok((0, 0)));
        driver.expect_move_and_click().never();
        let use_case = ReplayClickUseCase::new(Arc::new(driver));

        let err = use_case.replay(point(0.5, 0.5)).unwrap_err();
        assert!(matches!(err, PlatformError::InputDriverFailure(_)));
    }

    #[test]
    fn test_replay_propagates_driver_failure() {
        let mut driver = MockLocalInputDriver::new();
        driver.expect_screen_size().returning(|| Ok((800, 600)));
        driver
            .expect_move_and_click()
            .returning(|_, _| Err(PlatformError::InputDriverFailure("denied".into())));
        let use_case = ReplayClickUseCase::new(Arc::new(driver));

        assert_eq!(
            use_case.replay(point(0.5, 0.5)).unwrap_err(),
            PlatformError::InputDriverFailure("denied".into())
        );
    }

    #[test]
    fn test_capture_trigger_point_normalizes_cursor() {
        let mut driver = MockLocalInputDriver::new();
        driver.expect_cursor_position().returning(|| Ok((480, 810)));
        driver.expect_screen_size().returning(|| Ok((1920, 1080)));
        let use_case = ReplayClickUseCase::new(Arc::new(driver));

        let p = use_case.capture_trigger_point().unwrap();

        assert_eq!(p, point(0.25, 0.75));
    }

    #[test]
    fn test_capture_trigger_point_off_screen_is_error() {
        let mut driver = MockLocalInputDriver::new();
        driver.expect_cursor_position().returning(|| Ok((2500, 100)));
        driver.expect_screen_size().returning(|| Ok((1920, 1080)));
        let use_case = ReplayClickUseCase::new(Arc::new(driver));

        assert!(use_case.capture_trigger_point().is_err());
    }

    #[test]
    fn test_click_here_delegates_to_driver() {
        let mut driver = MockLocalInputDriver::new();
        driver.expect_click().times(1).returning(|| Ok(()));
        let use_case = ReplayClickUseCase::new(Arc::new(driver));

        tokio_test::assert_ok!(use_case.click_here());
    }
}
