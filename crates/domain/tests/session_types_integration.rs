//! Integration tests for session and queue domain types
//!
//! Covers the persisted forms the SDK writes to durable storage and reads
//! back after a restart.

use chrono::{Duration, TimeZone, Utc};
use intelligence_domain::{
    AnalyticsEvent, AuthenticationToken, EventContext, QueuedEvent, TokenState, User,
};

// ============================================================================
// Token persistence
// ============================================================================

/// A token parsed from the token endpoint and persisted survives a reload
/// with the same deadline and tier state.
///
/// Scenario: token issued, app restarted 30 minutes later, then 2 hours later
#[test]
fn test_token_reload_keeps_deadline() {
    let issued = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).single().unwrap();
    let body = r#"{"access_token":"t","token_type":"bearer","expires_in":3600,"refresh_token":"r"}"#;
    let token = AuthenticationToken::from_response(body, issued).unwrap().with_user_id(Some(12));

    let stored = serde_json::to_string(&token).unwrap();
    let reloaded: AuthenticationToken = serde_json::from_str(&stored).unwrap();

    assert_eq!(reloaded.user_id, Some(12));
    assert_eq!(reloaded.state(issued + Duration::minutes(30)), TokenState::Fresh);
    assert_eq!(reloaded.state(issued + Duration::hours(2)), TokenState::ExpiredRefreshable);
}

/// A blob written by an older build without the refresh token still loads.
#[test]
fn test_token_reload_tolerates_missing_fields() {
    let reloaded: AuthenticationToken =
        serde_json::from_str(r#"{"access_token":"t","token_type":"bearer"}"#).unwrap();
    let now = Utc::now();

    assert!(reloaded.requires_authentication(now));
    assert_eq!(reloaded.state(now), TokenState::ExpiredTerminal);
}

// ============================================================================
// Identity persistence
// ============================================================================

/// The internal user keeps its password across a reload; the public copy
/// does not expose it.
#[test]
fn test_internal_user_round_trip() {
    let mut user = User::internal(3, "svc-account".to_string(), "Xy9abcdefghij");
    user.id = Some(501);

    let stored = serde_json::to_string(&user).unwrap();
    let reloaded: User = serde_json::from_str(&stored).unwrap();

    assert_eq!(reloaded, user);
    assert!(reloaded.without_password().password.is_none());
}

// ============================================================================
// Queue snapshot
// ============================================================================

/// A snapshot array written before a crash reloads into identical events.
#[test]
fn test_snapshot_reload_preserves_order_and_dates() {
    let now = Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).single().unwrap();
    let context = EventContext { project_id: 1, application_id: 2, ..EventContext::default() };
    let events: Vec<QueuedEvent> = (0..3)
        .map(|i| {
            QueuedEvent::enrich(
                AnalyticsEvent::new(format!("Event{i}")),
                &context,
                now + Duration::seconds(i),
            )
        })
        .collect();

    let stored = serde_json::to_string(&events).unwrap();
    let reloaded: Vec<QueuedEvent> = serde_json::from_str(&stored).unwrap();

    assert_eq!(reloaded, events);
    assert_eq!(reloaded[2].created_at(), Some(now + Duration::seconds(2)));
}
