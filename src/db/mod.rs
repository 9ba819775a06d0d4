// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable key-value storage for credentials and the activity cache.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::AppError;

/// Key names as constants.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "strava_access_token";
    pub const REFRESH_TOKEN: &str = "strava_refresh_token";
    /// Stringified Unix seconds
    pub const EXPIRES_AT: &str = "strava_expires_at";
    /// JSON array of activities
    pub const ACTIVITIES_CACHE: &str = "strava_activities_cache";
    /// Stringified Unix seconds
    pub const ACTIVITIES_CACHE_TIME: &str = "strava_activities_cache_time";

    /// Keys holding the OAuth credential.
    pub const CREDENTIAL: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, EXPIRES_AT];
    /// Keys holding the activity cache.
    pub const CACHE: [&str; 2] = [ACTIVITIES_CACHE, ACTIVITIES_CACHE_TIME];
}

/// String-keyed persistent store.
///
/// Values are opaque strings; callers do their own (de)serialization.
/// Deleting a missing key is not an error.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn delete(&self, key: &str) -> Result<(), AppError>;
}
