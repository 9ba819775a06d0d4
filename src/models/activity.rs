// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity models as returned by the API and kept in the local cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Coordinate;
use crate::services::polyline;

/// Summary activity from the athlete activities list endpoint.
///
/// Records are never edited locally; the whole list is cached as one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: u64,
    /// Elapsed time in seconds
    #[serde(default)]
    pub elapsed_time: u64,
    /// Elevation gain in meters
    #[serde(default)]
    pub total_elevation_gain: f64,
    /// Legacy activity type (Ride, Run, Hike, etc.)
    #[serde(default, rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub sport_type: Option<String>,
    /// Start date/time (ISO 8601, UTC)
    #[serde(default)]
    pub start_date: String,
    /// Start date/time in the athlete's local time zone
    #[serde(default)]
    pub start_date_local: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub utc_offset: f64,
    #[serde(default)]
    pub start_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub end_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub map: ActivityMap,
    #[serde(default)]
    pub average_speed: f64,
    #[serde(default)]
    pub max_speed: f64,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub kudos_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub athlete_count: u32,
    #[serde(default)]
    pub photo_count: u32,
    #[serde(default)]
    pub achievement_count: u32,
    /// Fields not modeled above, kept so cached records match the API's.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StravaActivity {
    /// Get the detailed polyline, falling back to summary if not available.
    pub fn polyline(&self) -> Option<&str> {
        fn non_empty(p: &Option<String>) -> Option<&str> {
            p.as_deref().filter(|p| !p.is_empty())
        }
        non_empty(&self.map.polyline).or_else(|| non_empty(&self.map.summary_polyline))
    }

    /// Decode the activity's route into coordinates.
    ///
    /// Activities without GPS data (treadmill, manual entries) yield an empty route.
    pub fn route(&self) -> Vec<Coordinate> {
        self.polyline().map(polyline::decode).unwrap_or_default()
    }
}

/// Activity map data with polylines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMap {
    #[serde(default)]
    pub id: String,
    /// Full-resolution polyline (detailed activity endpoint only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
    #[serde(default)]
    pub summary_polyline: Option<String>,
    #[serde(default)]
    pub resource_state: u8,
}

/// One stream of an activity (e.g. `latlng`, `altitude`, `time`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStream {
    /// Raw samples; shape depends on the stream type
    pub data: serde_json::Value,
    #[serde(default)]
    pub series_type: Option<String>,
    #[serde(default)]
    pub original_size: Option<u64>,
    #[serde(default)]
    pub resolution: Option<String>,
}

impl ActivityStream {
    /// Interpret a `latlng` stream as coordinates. Malformed samples are skipped.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.data
            .as_array()
            .map(|samples| {
                samples
                    .iter()
                    .filter_map(|s| {
                        let pair = s.as_array()?;
                        Some(Coordinate::new(pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Streams keyed by type, as returned with `key_by_type=true`.
pub type StreamSet = BTreeMap<String, ActivityStream>;

/// Default stream types requested for an activity.
pub const DEFAULT_STREAM_TYPES: &[&str] = &["latlng", "altitude", "time"];

/// The locally cached activity collection.
///
/// Replaced wholesale on every fetch; never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityCache {
    pub activities: Vec<StravaActivity>,
    /// When the collection was fetched (Unix seconds)
    pub fetched_at: i64,
}

impl ActivityCache {
    /// Age of the cache at `now`, in seconds.
    ///
    /// `None` when the fetch time lies after `now` or is too far away to
    /// subtract; such a timestamp cannot vouch for freshness.
    pub fn age(&self, now: i64) -> Option<i64> {
        now.checked_sub(self.fetched_at).filter(|age| *age >= 0)
    }

    /// Whether the cache is younger than `ttl_secs` at `now`.
    pub fn is_fresh(&self, now: i64, ttl_secs: i64) -> bool {
        matches!(self.age(now), Some(age) if age < ttl_secs)
    }
}
