//! Wall-clock abstraction
//!
//! Token expiry and the analytics retention window are both absolute UTC
//! instants, so the abstraction is over `chrono::DateTime<Utc>` rather than
//! `Instant`.
//!
//! ```
//! use chrono::Duration;
//! use intelligence_common::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::hours(25));
//! assert_eq!(clock.now() - start, Duration::hours(25));
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current UTC time.
pub trait Clock: Send + Sync + 'static {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch.
    fn millis_since_epoch(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Clock handle shared between the session, the event queue and the facade.
pub type SharedClock = Arc<dyn Clock>;

/// Real system clock. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// hand another to the component under test.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock starting at the current real time.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a mock clock frozen at `instant`.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(instant)) }
    }

    /// Move the clock forward (or backward, for negative durations).
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock();
        *current += duration;
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for time.
    use chrono::TimeZone;

    use super::*;

    /// Validates the system clock scenario.
    ///
    /// Assertions:
    /// - Ensures `now2 >= now1` evaluates to true.
    #[test]
    fn test_system_clock() {
        let clock = SystemClock;
        let now1 = clock.now();
        let now2 = clock.now();

        assert!(now2 >= now1);
        assert!(clock.millis_since_epoch() > 0);
    }

    /// Validates `MockClock::advance` moves every clone together.
    #[test]
    fn test_mock_clock_advance_is_shared() {
        let clock = MockClock::new();
        let observer = clock.clone();
        let start = observer.now();

        clock.advance(Duration::seconds(5));

        assert_eq!(observer.now() - start, Duration::seconds(5));
    }

    /// Validates `MockClock::set` replaces the current instant.
    #[test]
    fn test_mock_clock_set() {
        let fixed = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap();
        let clock = MockClock::new();

        clock.set(fixed);

        assert_eq!(clock.now(), fixed);
        assert_eq!(clock.millis_since_epoch(), fixed.timestamp_millis());
    }
}
