//! Exponential reconnect delay.

use std::time::Duration;

/// Reconnect delay that doubles after every failed attempt, up to a cap.
///
/// ```rust
/// use std::time::Duration;
/// use clicksync_client::application::Backoff;
///
/// let mut b = Backoff::new(Duration::from_secs(2), Duration::from_secs(5));
/// assert_eq!(b.next_delay(), Duration::from_secs(2));
/// assert_eq!(b.next_delay(), Duration::from_secs(4));
/// assert_eq!(b.next_delay(), Duration::from_secs(5));
/// b.reset();
/// assert_eq!(b.next_delay(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `initial` and capped at `max`.
    ///
    /// If `initial` exceeds `max`, every delay is `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the delay to wait now and advances to the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Starts over from the initial delay.  Called after a successful connect.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
