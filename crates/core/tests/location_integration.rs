//! Integration tests for geofence fetches and the geofence cache.

mod support;

use std::collections::BTreeSet;

use intelligence_core::testing::MockReply;
use intelligence_core::{DurableStore, HttpMethod};
use intelligence_domain::constants::KEY_GEOFENCE_CACHE;
use intelligence_domain::{GeofenceQuery, Geolocation, IntelligenceError, RequestError};
use serde_json::{json, Value};
use support::{data_reply, token_reply, Harness};

const GEOFENCES: &str = "/location/projects/20/geofences";

async fn started() -> Harness {
    let harness = Harness::new();
    harness.seed_internal_session();
    harness.scheduler.start().await.unwrap();
    harness
}

fn geofence(id: i64, name: &str) -> Value {
    json!({
        "Id": id,
        "ProjectId": 20,
        "Name": name,
        "Radius": 100.0,
        "Geolocation": {"Latitude": 51.5, "Longitude": -0.12},
    })
}

#[tokio::test]
async fn test_fetch_sends_area_and_paging() -> anyhow::Result<()> {
    let harness = started().await;
    harness
        .transport
        .on(HttpMethod::Get, GEOFENCES, data_reply(json!([geofence(1, "HQ"), geofence(2, "Depot")])));
    let here = Geolocation { latitude: 51.5, longitude: -0.12 };

    let geofences = harness.location().geofences(GeofenceQuery::around(Some(here))).await?;

    assert_eq!(geofences.len(), 2);
    assert_eq!(geofences[1].name.as_deref(), Some("Depot"));
    let requests = harness.transport.requests();
    let request = &requests[0];
    assert_eq!(request.query_value("latitude"), Some("51.5"));
    assert_eq!(request.query_value("longitude"), Some("-0.12"));
    assert_eq!(request.query_value("radius"), Some("10000"));
    assert_eq!(request.header_value("Authorization"), Some("Bearer internal"));

    // Plain lookups leave the cache alone.
    assert!(harness.store.get_string_set(KEY_GEOFENCE_CACHE).is_none());
    Ok(())
}

/// A refresh replaces the cache wholesale.
#[tokio::test]
async fn test_refresh_replaces_cache() -> anyhow::Result<()> {
    let harness = started().await;
    harness
        .transport
        .on(HttpMethod::Get, GEOFENCES, data_reply(json!([geofence(3, "Old")])))
        .on(HttpMethod::Get, GEOFENCES, data_reply(json!([geofence(2, "B"), geofence(1, "A")])));
    let location = harness.location();

    location.refresh_cached_geofences(GeofenceQuery::default()).await?;
    location.refresh_cached_geofences(GeofenceQuery::default()).await?;

    let cached = location.cached_geofences();
    let ids: Vec<_> = cached.iter().map(|geofence| geofence.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2)]);
    assert_eq!(harness.store.get_string_set(KEY_GEOFENCE_CACHE).map(|set| set.len()), Some(2));
    Ok(())
}

/// A failed refresh keeps the previous cache.
#[tokio::test]
async fn test_failed_refresh_keeps_cache() -> anyhow::Result<()> {
    let harness = started().await;
    harness
        .transport
        .on(HttpMethod::Get, GEOFENCES, data_reply(json!([geofence(1, "HQ")])))
        .on(HttpMethod::Get, GEOFENCES, MockReply::status(500));
    let location = harness.location();

    location.refresh_cached_geofences(GeofenceQuery::default()).await?;
    assert!(location.refresh_cached_geofences(GeofenceQuery::default()).await.is_err());

    assert_eq!(location.cached_geofences().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_cache_entries_are_skipped() -> anyhow::Result<()> {
    let harness = started().await;
    let entries: BTreeSet<String> =
        [geofence(4, "Kept").to_string(), "not json".to_string()].into_iter().collect();
    harness.store.set_string_set(KEY_GEOFENCE_CACHE, &entries, true)?;

    let cached = harness.location().cached_geofences();

    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, Some(4));
    Ok(())
}

#[tokio::test]
async fn test_offline_fetch_fails_without_sending() {
    let harness = started().await;
    harness.connectivity.set_connected(false);

    let err = harness.location().geofences(GeofenceQuery::default()).await.unwrap_err();

    assert_eq!(err, IntelligenceError::from(RequestError::Offline));
    assert!(harness.transport.requests().is_empty());
    assert!(harness.location().cached_geofences().is_empty());
}

/// A 401 reauthenticates and replays the fetch once.
#[tokio::test]
async fn test_unauthorized_fetch_reauthenticates_and_replays_once() -> anyhow::Result<()> {
    let harness = started().await;
    harness
        .transport
        .on(HttpMethod::Get, GEOFENCES, MockReply::status(401))
        .on(HttpMethod::Get, GEOFENCES, data_reply(json!([geofence(1, "HQ")])))
        .on(HttpMethod::Get, "/validate", MockReply::status(401))
        .on_grant("password", token_reply("internal-2"));

    let geofences = harness.location().refresh_cached_geofences(GeofenceQuery::default()).await?;

    assert_eq!(geofences.len(), 1);
    let fetches: Vec<_> = harness
        .transport
        .requests()
        .into_iter()
        .filter(|request| request.url.ends_with(GEOFENCES))
        .collect();
    assert_eq!(fetches.len(), 2);
    assert_eq!(fetches[1].header_value("Authorization"), Some("Bearer internal-2"));
    Ok(())
}
