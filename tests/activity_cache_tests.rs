// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity history pagination and cache tests.
//!
//! These tests verify that:
//! 1. Pagination stops at the first short page
//! 2. The cache is served for under an hour and refetched after
//! 3. A corrupt cache is a miss, never an error
//! 4. A cache time ahead of the clock never counts as fresh

use serde_json::json;
use strava_atlas::db::{keys, KeyValueStore};

mod common;
use common::{page_of, signed_in_harness, API_BASE, T0};

#[tokio::test]
async fn test_fetch_all_stops_after_short_page() {
    let h = signed_in_harness(T0 + 21600);
    h.transport.push_get(200, page_of(1, 200));
    h.transport.push_get(200, page_of(201, 200));
    h.transport.push_get(200, page_of(401, 47));

    let activities = h.client.fetch_all_activities().await.unwrap();

    assert_eq!(activities.len(), 447);
    assert_eq!(activities.first().unwrap().id, 1);
    assert_eq!(activities.last().unwrap().id, 447);

    let urls: Vec<String> = h.transport.gets().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/athlete/activities?page=1&per_page=200", API_BASE),
            format!("{}/athlete/activities?page=2&per_page=200", API_BASE),
            format!("{}/athlete/activities?page=3&per_page=200", API_BASE),
        ]
    );

    let cache = h.client.cached_activities().unwrap();
    assert_eq!(cache.activities, activities);
    assert_eq!(cache.fetched_at, T0);
}

#[tokio::test]
async fn test_fetch_all_with_exact_page_multiple() {
    let h = signed_in_harness(T0 + 21600);
    h.transport.push_get(200, page_of(1, 200));
    h.transport.push_get(200, json!([]));

    let activities = h.client.fetch_all_activities().await.unwrap();

    assert_eq!(activities.len(), 200);
    assert_eq!(h.transport.gets().len(), 2);
}

#[tokio::test]
async fn test_fetch_all_with_no_activities_caches_empty_list() {
    let h = signed_in_harness(T0 + 21600);
    h.transport.push_get(200, json!([]));

    assert!(h.client.fetch_all_activities().await.unwrap().is_empty());
    assert_eq!(h.store.get(keys::ACTIVITIES_CACHE).unwrap().as_deref(), Some("[]"));
    assert_eq!(
        h.store.get(keys::ACTIVITIES_CACHE_TIME).unwrap(),
        Some(T0.to_string())
    );
}

#[tokio::test]
async fn test_failed_page_leaves_cache_untouched() {
    let h = signed_in_harness(T0 + 21600);
    h.transport.push_get(200, page_of(1, 200));
    h.transport.push_get(503, json!("Service Unavailable"));

    let err = h.client.fetch_all_activities().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(h.client.cached_activities().is_none());
}

#[tokio::test]
async fn test_cache_served_within_an_hour() {
    let h = signed_in_harness(T0 + 21600);
    h.transport.push_get(200, page_of(1, 3));
    h.client.get_activities(false).await.unwrap();

    h.clock.set(T0 + 3599);
    let cached = h.client.get_activities(false).await.unwrap();

    assert_eq!(cached.len(), 3);
    assert_eq!(h.transport.gets().len(), 1, "fresh cache must not hit the network");
}

#[tokio::test]
async fn test_stale_cache_triggers_fetch() {
    let h = signed_in_harness(T0 + 21600);
    h.transport.push_get(200, page_of(1, 3));
    h.client.get_activities(false).await.unwrap();

    h.clock.set(T0 + 3601);
    h.transport.push_get(200, page_of(1, 5));
    let refreshed = h.client.get_activities(false).await.unwrap();

    assert_eq!(refreshed.len(), 5);
    assert_eq!(h.transport.gets().len(), 2);
    assert_eq!(h.client.cached_activities().unwrap().fetched_at, T0 + 3601);
}

#[tokio::test]
async fn test_force_refresh_bypasses_fresh_cache() {
    let h = signed_in_harness(T0 + 21600);
    h.transport.push_get(200, page_of(1, 3));
    h.client.get_activities(false).await.unwrap();

    h.clock.advance(10);
    h.transport.push_get(200, page_of(1, 4));
    let activities = h.client.get_activities(true).await.unwrap();

    assert_eq!(activities.len(), 4);
    assert_eq!(h.transport.gets().len(), 2);
}

#[tokio::test]
async fn test_malformed_cache_is_a_miss() {
    let fresh = T0.to_string();
    let cases = [
        ("not json", fresh.as_str()),
        (r#"{"id": 1}"#, fresh.as_str()),
        (r#"[{"name": "no id"}]"#, fresh.as_str()),
        ("[]", "yesterday"),
        ("[]", "-9223372036854775808"),
        ("[]", "9223372036854775807"),
    ];

    for (records, fetched_at) in cases {
        let h = signed_in_harness(T0 + 21600);
        h.store.set(keys::ACTIVITIES_CACHE, records).unwrap();
        h.store.set(keys::ACTIVITIES_CACHE_TIME, fetched_at).unwrap();
        h.transport.push_get(200, page_of(1, 2));

        let activities = h.client.get_activities(false).await.unwrap();

        assert_eq!(
            activities.len(),
            2,
            "cache {:?} at {:?} should be ignored",
            records,
            fetched_at
        );
        assert_eq!(h.transport.gets().len(), 1);
    }
}

#[tokio::test]
async fn test_cache_without_timestamp_is_a_miss() {
    let h = signed_in_harness(T0 + 21600);
    h.store.set(keys::ACTIVITIES_CACHE, "[]").unwrap();
    h.transport.push_get(200, page_of(1, 1));

    assert_eq!(h.client.get_activities(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_future_cache_time_is_replaced_by_forced_refresh() {
    let h = signed_in_harness(T0 + 21600);
    h.store.set(keys::ACTIVITIES_CACHE, "[]").unwrap();
    h.store
        .set(keys::ACTIVITIES_CACHE_TIME, &(T0 + 86400).to_string())
        .unwrap();

    h.transport.push_get(200, page_of(1, 5));
    h.client.get_activities(true).await.unwrap();
    assert_eq!(h.client.cached_activities().unwrap().fetched_at, T0);

    // Two hours later the refreshed cache has expired like any other.
    h.clock.set(T0 + 7200);
    h.transport.push_get(200, page_of(1, 9));
    let activities = h.client.get_activities(false).await.unwrap();

    assert_eq!(activities.len(), 9);
    assert_eq!(h.transport.gets().len(), 2);
}

#[tokio::test]
async fn test_future_cache_time_is_not_fresh() {
    let h = signed_in_harness(T0 + 21600);
    h.store.set(keys::ACTIVITIES_CACHE, "[]").unwrap();
    h.store
        .set(keys::ACTIVITIES_CACHE_TIME, &(T0 * 1000).to_string())
        .unwrap();
    h.transport.push_get(200, page_of(1, 3));

    let activities = h.client.get_activities(false).await.unwrap();

    assert_eq!(activities.len(), 3);
    assert_eq!(h.client.cached_activities().unwrap().fetched_at, T0);
}

#[tokio::test]
async fn test_logout_drops_cache_and_requires_sign_in() {
    let h = signed_in_harness(T0 + 21600);
    h.transport.push_get(200, page_of(1, 2));
    h.client.get_activities(false).await.unwrap();

    h.client.logout().unwrap();
    assert!(h.client.cached_activities().is_none());

    let err = h.client.get_activities(false).await.unwrap_err();
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_cache_keeps_fields_the_model_does_not_name() {
    let h = signed_in_harness(T0 + 21600);
    let mut record = common::activity_json(7);
    record["gear_id"] = json!("b123");
    record["device_name"] = json!("Garmin Edge 540");
    h.transport.push_get(200, json!([record]));

    h.client.get_activities(false).await.unwrap();

    let raw = h.store.get(keys::ACTIVITIES_CACHE).unwrap().unwrap();
    let cached: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(cached[0]["gear_id"], "b123");
    assert_eq!(cached[0]["device_name"], "Garmin Edge 540");

    let served = h.client.get_activities(false).await.unwrap();
    assert_eq!(served[0].extra["gear_id"], "b123");
    assert_eq!(h.transport.gets().len(), 1);
}
