// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use strava_atlas::db::{keys, KeyValueStore, MemoryStore};
use strava_atlas::error::TransportError;
use strava_atlas::services::{Clock, HttpResponse, HttpTransport, StravaClient, StravaConfig};

#[allow(dead_code)]
pub const API_BASE: &str = "https://strava.test/api/v3";
#[allow(dead_code)]
pub const TOKEN_URL: &str = "https://strava.test/oauth/token";

/// Fixed "now" used by most tests.
#[allow(dead_code)]
pub const T0: i64 = 1_750_000_000;

/// A request seen by the fake transport.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

type Scripted = Result<HttpResponse, TransportError>;

/// Transport that replays scripted responses in order and records requests.
///
/// GET and POST have separate queues. An empty queue answers with a network
/// error so unexpected calls fail loudly.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeTransport {
    gets: Mutex<VecDeque<Scripted>>,
    posts: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[allow(dead_code)]
impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_get(&self, status: u16, body: Value) {
        self.gets
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    pub fn push_get_error(&self, error: TransportError) {
        self.gets.lock().unwrap().push_back(Err(error));
    }

    pub fn push_post(&self, status: u16, body: Value) {
        self.posts
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    pub fn push_post_error(&self, error: TransportError) {
        self.posts.lock().unwrap().push_back(Err(error));
    }

    /// Queue a successful token endpoint response.
    pub fn push_token(&self, access: &str, refresh: &str, expires_at: i64) {
        self.push_post(
            200,
            json!({
                "token_type": "Bearer",
                "access_token": access,
                "refresh_token": refresh,
                "expires_at": expires_at,
                "expires_in": 21600,
                "athlete": { "id": 42 }
            }),
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "GET")
            .collect()
    }

    pub fn posts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect()
    }

    fn next(queue: &Mutex<VecDeque<Scripted>>, url: &str) -> Scripted {
        queue.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(TransportError::Network(format!(
                "no scripted response for {}",
                url
            )))
        })
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get_bearer(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            bearer: Some(access_token.to_string()),
            body: None,
        });
        // Give other tasks a chance to interleave, like real I/O would.
        tokio::task::yield_now().await;
        Self::next(&self.gets, url)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            bearer: None,
            body: Some(body.clone()),
        });
        tokio::task::yield_now().await;
        Self::next(&self.posts, url)
    }
}

/// Clock that only moves when told to.
#[allow(dead_code)]
pub struct ManualClock(AtomicI64);

#[allow(dead_code)]
impl ManualClock {
    pub fn at(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a client test needs, wired to fakes.
#[allow(dead_code)]
pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub client: StravaClient,
}

#[allow(dead_code)]
pub fn test_config() -> StravaConfig {
    StravaConfig {
        client_id: "12345".to_string(),
        client_secret: "s3cret".to_string(),
        redirect_uri: "myapp://auth/callback".to_string(),
        api_base_url: API_BASE.to_string(),
        oauth_base_url: "https://strava.test/oauth".to_string(),
    }
}

/// Build a client over `store`, which may already hold state.
#[allow(dead_code)]
pub fn harness_with_store(store: MemoryStore) -> Harness {
    let transport = FakeTransport::new();
    let clock = ManualClock::at(T0);
    let client = StravaClient::new(
        test_config(),
        transport.clone(),
        Arc::new(store.clone()),
        clock.clone(),
    )
    .expect("client should build over a memory store");

    Harness {
        transport,
        store,
        clock,
        client,
    }
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with_store(MemoryStore::new())
}

/// Harness with a signed-in user whose token expires at `expires_at`.
#[allow(dead_code)]
pub fn signed_in_harness(expires_at: i64) -> Harness {
    let store = MemoryStore::new();
    seed_credential(&store, "access-1", "refresh-1", expires_at);
    harness_with_store(store)
}

#[allow(dead_code)]
pub fn seed_credential(store: &MemoryStore, access: &str, refresh: &str, expires_at: i64) {
    store.set(keys::ACCESS_TOKEN, access).unwrap();
    store.set(keys::REFRESH_TOKEN, refresh).unwrap();
    store
        .set(keys::EXPIRES_AT, &expires_at.to_string())
        .unwrap();
}

#[allow(dead_code)]
pub fn credential_keys_absent(store: &MemoryStore) -> bool {
    keys::CREDENTIAL.iter().all(|k| !store.contains(k))
}

/// A summary activity as the list endpoint returns it.
#[allow(dead_code)]
pub fn activity_json(id: u64) -> Value {
    json!({
        "id": id,
        "name": format!("Activity {}", id),
        "distance": 10_000.0 + id as f64,
        "moving_time": 3600,
        "elapsed_time": 3700,
        "total_elevation_gain": 120.5,
        "type": "Ride",
        "sport_type": "Ride",
        "start_date": "2025-05-01T14:00:00Z",
        "start_date_local": "2025-05-01T07:00:00Z",
        "timezone": "(GMT-08:00) America/Los_Angeles",
        "utc_offset": -25200.0,
        "start_latlng": [38.5, -120.2],
        "end_latlng": [43.252, -126.453],
        "map": {
            "id": format!("a{}", id),
            "summary_polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@",
            "resource_state": 2
        },
        "average_speed": 2.8,
        "max_speed": 11.2,
        "kudos_count": 1,
        "comment_count": 0,
        "athlete_count": 1,
        "photo_count": 0,
        "achievement_count": 0
    })
}

/// A page of `count` activities with ids starting at `first_id`.
#[allow(dead_code)]
pub fn page_of(first_id: u64, count: usize) -> Value {
    Value::Array((0..count as u64).map(|i| activity_json(first_id + i)).collect())
}
