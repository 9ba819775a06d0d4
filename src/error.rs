// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Credential errors (`AuthenticationFailed`, `RefreshFailed`) are only raised
//! after the stored credential has been cleared. Transport errors other than a
//! 401 pass through unmodified and never touch stored state.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::ConfigError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid or expired token")]
    TokenInvalid,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No refresh token available")]
    RefreshUnavailable,

    #[error("Failed to refresh Strava token: {0}")]
    RefreshFailed(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failures reported by an HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Decode(String),
}

impl AppError {
    /// True for errors that mean the user has to sign in again.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::AuthenticationRequired
                | AppError::TokenInvalid
                | AppError::AuthenticationFailed(_)
                | AppError::RefreshUnavailable
                | AppError::RefreshFailed(_)
        )
    }

    /// HTTP status carried by a pass-through transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::AuthenticationRequired
            | AppError::TokenInvalid
            | AppError::RefreshUnavailable => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::AuthenticationFailed(msg) | AppError::RefreshFailed(msg) => (
                StatusCode::UNAUTHORIZED,
                "authentication_failed",
                Some(msg.clone()),
            ),
            AppError::Transport(err) => {
                (StatusCode::BAD_GATEWAY, "strava_error", Some(err.to_string()))
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Config(err) => {
                tracing::error!(error = %err, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
