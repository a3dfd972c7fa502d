//! Integration tests for the clock abstraction and the polling helpers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use intelligence_common::testing::{poll_until, timeout_ok};
use intelligence_common::{Clock, MockClock, SharedClock, SystemClock};

/// Clones of a mock clock share one instant, including through `SharedClock`.
#[test]
fn test_mock_clock_clones_share_time() {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let clock = MockClock::at(start);
    let shared: SharedClock = Arc::new(clock.clone());

    clock.advance(chrono::Duration::hours(25));

    assert_eq!(shared.now(), start + chrono::Duration::hours(25));
    assert_eq!(shared.millis_since_epoch(), (start + chrono::Duration::hours(25)).timestamp_millis());
}

#[test]
fn test_system_clock_is_current() {
    let before = Utc::now();
    let now = SystemClock.now();
    assert!(now >= before);
}

/// `poll_until` observes a change made by a background task.
#[tokio::test]
async fn test_poll_until_sees_background_progress() {
    let clock = MockClock::at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    let target = clock.now() + chrono::Duration::minutes(5);

    let background = clock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        background.set(target);
    });

    let observed = poll_until(Duration::from_secs(2), Duration::from_millis(5), || {
        let reached = clock.now() >= target;
        async move { reached }
    })
    .await;

    assert!(observed);
}

#[tokio::test]
async fn test_timeout_ok_reports_elapsed() {
    let result = timeout_ok(Duration::from_millis(10), tokio::time::sleep(Duration::from_secs(1))).await;
    assert!(result.is_err());
}
