// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local use.

use std::env;
use std::path::PathBuf;

const DEFAULT_API_BASE_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_OAUTH_BASE_URL: &str = "https://www.strava.com/oauth";
const DEFAULT_CALLBACK_PORT: u16 = 8089;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Redirect URI registered with the Strava application
    pub redirect_uri: String,
    /// Base URL of the Strava REST API
    pub api_base_url: String,
    /// Base URL of the Strava OAuth endpoints (authorize, token)
    pub oauth_base_url: String,
    /// Location of the durable key-value store
    pub store_path: PathBuf,
    /// Port the local OAuth callback listener binds to
    pub callback_port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            redirect_uri: default_redirect_uri(DEFAULT_CALLBACK_PORT),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
            store_path: PathBuf::from("strava-atlas-test-store.json"),
            callback_port: DEFAULT_CALLBACK_PORT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let callback_port = env::var("CALLBACK_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_CALLBACK_PORT);

        Ok(Self {
            strava_client_id: env::var("STRAVA_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            strava_client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?,
            redirect_uri: env::var("STRAVA_REDIRECT_URI")
                .unwrap_or_else(|_| default_redirect_uri(callback_port)),
            api_base_url: env::var("STRAVA_API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            oauth_base_url: env::var("STRAVA_OAUTH_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_OAUTH_BASE_URL.to_string()),
            store_path: env::var("STRAVA_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_store_path()),
            callback_port,
        })
    }

    /// The subset of configuration the Strava client needs.
    pub fn strava(&self) -> crate::services::strava::StravaConfig {
        crate::services::strava::StravaConfig {
            client_id: self.strava_client_id.clone(),
            client_secret: self.strava_client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            api_base_url: self.api_base_url.clone(),
            oauth_base_url: self.oauth_base_url.clone(),
        }
    }
}

fn default_redirect_uri(port: u16) -> String {
    format!("http://localhost:{}/auth/callback", port)
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("strava-atlas")
        .join("store.json")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
