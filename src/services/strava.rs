// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client with OAuth token lifecycle and activity caching.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Token refresh when expired (one refresh in flight at a time)
//! - Authenticated requests, clearing the credential on 401
//! - Full activity history retrieval with pagination
//! - Time-bounded caching of the activity history
//!
//! Credential state lives in the injected [`KeyValueStore`]; the access token
//! is mirrored in memory so `is_authenticated` needs no I/O.

use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use crate::db::{keys, KeyValueStore};
use crate::error::{AppError, Result, TransportError};
use crate::models::activity::DEFAULT_STREAM_TYPES;
use crate::models::{
    ActivityCache, OAuthCredential, StravaActivity, StreamSet, TokenRequest, TokenResponse,
};
use crate::services::clock::Clock;
use crate::services::transport::{HttpResponse, HttpTransport};

/// Strava's maximum page size for list endpoints.
pub const MAX_PER_PAGE: u32 = 200;

/// How long a fetched activity history is served from cache (1 hour).
pub const CACHE_TTL_SECS: i64 = 60 * 60;

/// Scopes requested at authorization: profile read plus all activities.
const SCOPES: &str = "read,activity:read_all";

const DEFAULT_API_BASE_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_OAUTH_BASE_URL: &str = "https://www.strava.com/oauth";

/// OAuth application settings and endpoint locations.
#[derive(Debug, Clone)]
pub struct StravaConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub api_base_url: String,
    pub oauth_base_url: String,
}

impl StravaConfig {
    /// Settings pointing at the public Strava endpoints.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
        }
    }

    fn token_url(&self) -> String {
        format!("{}/token", self.oauth_base_url)
    }
}

/// Strava client owning a single user's credential and activity cache.
pub struct StravaClient {
    config: StravaConfig,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// In-memory copy of the stored access token.
    access_token: RwLock<Option<String>>,
    /// Serializes expiry-triggered refreshes so a rotated refresh token is
    /// never spent twice.
    refresh_lock: Mutex<()>,
}

impl StravaClient {
    /// Create a client, picking up any access token already in the store.
    pub fn new(
        config: StravaConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let access_token = store.get(keys::ACCESS_TOKEN)?.filter(|t| !t.is_empty());

        Ok(Self {
            config,
            transport,
            store,
            clock,
            access_token: RwLock::new(access_token),
            refresh_lock: Mutex::new(()),
        })
    }

    // ─── Authorization ───────────────────────────────────────────────────────

    /// Build the Strava authorization URL the user should be sent to.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}/authorize?client_id={}&redirect_uri={}&response_type=code&scope={}&approval_prompt=force",
            self.config.oauth_base_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(SCOPES),
        )
    }

    /// Exchange an authorization code for tokens and persist them.
    ///
    /// On failure the current credential, if any, is left as it was.
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<()> {
        let request = TokenRequest {
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            code: Some(code),
            refresh_token: None,
            grant_type: "authorization_code",
        };

        let tokens = self.post_token(&request).await.map_err(|e| {
            tracing::error!(error = %e, "Strava token exchange failed");
            AppError::AuthenticationFailed(format!("Token exchange failed: {}", e))
        })?;

        self.save_credential(&tokens.into())?;
        tracing::info!("Authorization code exchanged, credential stored");
        Ok(())
    }

    /// Refresh the access token using the stored refresh token.
    ///
    /// Any failure of the refresh call clears the credential.
    pub async fn refresh_token(&self) -> Result<()> {
        let refresh_token = self
            .store
            .get(keys::REFRESH_TOKEN)?
            .filter(|t| !t.is_empty())
            .ok_or(AppError::RefreshUnavailable)?;

        let request = TokenRequest {
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            code: None,
            refresh_token: Some(&refresh_token),
            grant_type: "refresh_token",
        };

        match self.post_token(&request).await {
            Ok(tokens) => {
                // The old refresh token is spent; a half-written credential
                // cannot be refreshed again.
                if let Err(e) = self.save_credential(&tokens.into()) {
                    tracing::error!(
                        error = %e,
                        "Failed to store refreshed credential, clearing"
                    );
                    self.clear_credential_logged();
                    return Err(e);
                }
                tracing::info!("Access token refreshed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing credential");
                self.clear_credential_logged();
                Err(AppError::RefreshFailed(e.to_string()))
            }
        }
    }

    /// Check whether the held access token is usable, refreshing it once if
    /// it has expired. Refresh errors are reported as `false`.
    pub async fn is_token_valid(&self) -> bool {
        if self.access_token().is_none() {
            return false;
        }

        let now = self.clock.now_epoch_secs();
        match self.stored_expiry() {
            None => return false,
            Some(expires_at) if now < expires_at => return true,
            Some(_) => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed (or cleared) while we waited.
        if self.access_token().is_none() {
            return false;
        }
        if matches!(self.stored_expiry(), Some(expires_at) if now < expires_at) {
            return true;
        }

        tracing::info!("Access token expired, refreshing");
        match self.refresh_token().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Could not refresh expired token");
                false
            }
        }
    }

    /// Whether an access token is held.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// The stored credential, if all of its parts are present.
    pub fn credential(&self) -> Result<Option<OAuthCredential>> {
        let access_token = self.store.get(keys::ACCESS_TOKEN)?;
        let refresh_token = self.store.get(keys::REFRESH_TOKEN)?;
        let expires_at = self
            .store
            .get(keys::EXPIRES_AT)?
            .and_then(|v| v.trim().parse::<i64>().ok());

        Ok(match (access_token, refresh_token, expires_at) {
            (Some(access_token), Some(refresh_token), Some(expires_at)) => Some(OAuthCredential {
                access_token,
                refresh_token,
                expires_at,
            }),
            _ => None,
        })
    }

    /// Clear the activity cache and the credential.
    pub fn logout(&self) -> Result<()> {
        for key in keys::CACHE {
            self.store.delete(key)?;
        }
        self.clear_credential()?;
        tracing::info!("Logged out");
        Ok(())
    }

    // ─── Authenticated Requests ──────────────────────────────────────────────

    /// GET `url` with the bearer token and decode the JSON response.
    ///
    /// A 401 clears the credential and yields `AuthenticationFailed`; other
    /// HTTP errors pass through as transport errors with state untouched.
    pub async fn authenticated_request<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        if self.access_token().is_none() {
            return Err(AppError::AuthenticationRequired);
        }

        if !self.is_token_valid().await {
            return Err(AppError::TokenInvalid);
        }

        // The token may have been rotated by the validity check.
        let access_token = self.access_token().ok_or(AppError::TokenInvalid)?;

        let response = self.transport.get_bearer(url, &access_token).await?;

        if response.status == 401 {
            tracing::warn!(url, "Strava rejected access token (401), clearing credential");
            self.clear_credential_logged();
            return Err(AppError::AuthenticationFailed(
                "Strava rejected the access token".to_string(),
            ));
        }

        let body = check_response(response)?;
        serde_json::from_value(body)
            .map_err(|e| AppError::Transport(TransportError::Decode(e.to_string())))
    }

    // ─── API Wrappers ────────────────────────────────────────────────────────

    /// List one page of the athlete's activities.
    ///
    /// `page` is clamped to at least 1 and `per_page` to `1..=200`.
    pub async fn get_activities_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivity>> {
        let url = format!(
            "{}/athlete/activities?page={}&per_page={}",
            self.config.api_base_url,
            page.max(1),
            per_page.clamp(1, MAX_PER_PAGE)
        );
        self.authenticated_request(&url).await
    }

    /// Fetch the athlete's entire activity history and replace the cache.
    pub async fn fetch_all_activities(&self) -> Result<Vec<StravaActivity>> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let fetched = self.get_activities_page(page, MAX_PER_PAGE).await?;
            let count = fetched.len();
            tracing::debug!(page, count, "Fetched activities page");

            all.extend(fetched);
            if count < MAX_PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        let fetched_at = self.write_cache(&all)?;
        tracing::info!(
            count = all.len(),
            pages = page,
            fetched_at,
            "Activity history fetched and cached"
        );
        Ok(all)
    }

    /// Return the activity history, from cache when it is under an hour old.
    pub async fn get_activities(&self, force_refresh: bool) -> Result<Vec<StravaActivity>> {
        if !force_refresh {
            let now = self.clock.now_epoch_secs();
            if let Some(cache) = self.cached_activities() {
                if cache.is_fresh(now, CACHE_TTL_SECS) {
                    tracing::debug!(
                        count = cache.activities.len(),
                        age = cache.age(now),
                        "Serving activities from cache"
                    );
                    return Ok(cache.activities);
                }
                tracing::debug!(
                    fetched_at = cache.fetched_at,
                    now,
                    "Activity cache is stale"
                );
            }
        }

        self.fetch_all_activities().await
    }

    /// Get a detailed activity by ID.
    pub async fn get_activity(&self, activity_id: u64) -> Result<StravaActivity> {
        let url = format!("{}/activities/{}", self.config.api_base_url, activity_id);
        self.authenticated_request(&url).await
    }

    /// Get streams for an activity, keyed by stream type.
    ///
    /// An empty `types` requests latlng, altitude and time.
    pub async fn get_activity_streams(
        &self,
        activity_id: u64,
        types: &[&str],
    ) -> Result<StreamSet> {
        let types = if types.is_empty() {
            DEFAULT_STREAM_TYPES
        } else {
            types
        };
        let url = format!(
            "{}/activities/{}/streams/{}?key_by_type=true",
            self.config.api_base_url,
            activity_id,
            types.join(",")
        );
        self.authenticated_request(&url).await
    }

    // ─── Activity Cache ──────────────────────────────────────────────────────

    /// Read the cached activity history without checking its age.
    ///
    /// Missing, unreadable, or malformed entries all count as no cache.
    pub fn cached_activities(&self) -> Option<ActivityCache> {
        let (raw, fetched_at) = match (
            self.store.get(keys::ACTIVITIES_CACHE),
            self.store.get(keys::ACTIVITIES_CACHE_TIME),
        ) {
            (Ok(Some(raw)), Ok(Some(time))) => (raw, time),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Could not read activity cache");
                return None;
            }
            _ => return None,
        };

        let fetched_at = fetched_at.trim().parse::<i64>().ok()?;

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v @ serde_json::Value::Array(_)) => v,
            Ok(_) => {
                tracing::debug!("Ignoring activity cache that is not an array");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed activity cache");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(activities) => Some(ActivityCache {
                activities,
                fetched_at,
            }),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring activity cache with invalid records");
                None
            }
        }
    }

    /// Replace the cached history, stamped with the current time.
    ///
    /// A previous timestamp ahead of the clock is overwritten rather than
    /// kept, so a skewed or mis-scaled value cannot pin the cache as fresh.
    fn write_cache(&self, activities: &[StravaActivity]) -> Result<i64> {
        let fetched_at = self.clock.now_epoch_secs();
        if let Some(previous) = self
            .store
            .get(keys::ACTIVITIES_CACHE_TIME)?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|previous| *previous > fetched_at)
        {
            tracing::warn!(
                previous,
                fetched_at,
                "Replacing activity cache time from the future"
            );
        }

        let json = serde_json::to_string(activities)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize cache: {}", e)))?;

        self.store.set(keys::ACTIVITIES_CACHE, &json)?;
        self.store.set(keys::ACTIVITIES_CACHE_TIME, &fetched_at.to_string())?;
        Ok(fetched_at)
    }

    // ─── Credential Storage ──────────────────────────────────────────────────

    fn access_token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stored expiry. An unparsable value reads as already expired.
    fn stored_expiry(&self) -> Option<i64> {
        match self.store.get(keys::EXPIRES_AT) {
            Ok(Some(raw)) => Some(raw.trim().parse::<i64>().unwrap_or(i64::MIN)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read token expiry");
                None
            }
        }
    }

    fn save_credential(&self, credential: &OAuthCredential) -> Result<()> {
        self.store.set(keys::ACCESS_TOKEN, &credential.access_token)?;
        self.store.set(keys::REFRESH_TOKEN, &credential.refresh_token)?;
        self.store.set(keys::EXPIRES_AT, &credential.expires_at.to_string())?;

        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) =
            Some(credential.access_token.clone());
        Ok(())
    }

    fn clear_credential(&self) -> Result<()> {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = None;
        for key in keys::CREDENTIAL {
            self.store.delete(key)?;
        }
        Ok(())
    }

    /// Clear on a failure path, where the original error is the one to report.
    fn clear_credential_logged(&self) {
        if let Err(e) = self.clear_credential() {
            tracing::error!(error = %e, "Failed to clear stored credential");
        }
    }

    async fn post_token(&self, request: &TokenRequest<'_>) -> Result<TokenResponse> {
        let body = serde_json::to_value(request).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to encode token request: {}", e))
        })?;

        let response = self
            .transport
            .post_json(&self.config.token_url(), &body)
            .await?;

        let body = check_response(response)?;
        serde_json::from_value(body)
            .map_err(|e| AppError::Transport(TransportError::Decode(e.to_string())))
    }
}

/// Check response status and return the body if successful.
fn check_response(response: HttpResponse) -> Result<serde_json::Value> {
    if response.is_success() {
        return Ok(response.body);
    }

    if response.status == 429 {
        tracing::warn!("Strava rate limit hit (429)");
    }

    let body = match response.body {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };

    Err(AppError::Transport(TransportError::Status {
        status: response.status,
        body,
    }))
}
