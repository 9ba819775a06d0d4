// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth redirect receiver.
//!
//! Strava redirects the browser to `redirect_uri?code=...&scope=...` (or
//! `?error=access_denied`). The listener answers the browser and hands the
//! outcome to whoever is waiting to finish the token exchange.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::{AppError, Result};

/// Scope the activity history requires; users can untick it on the consent page.
const REQUIRED_SCOPE: &str = "activity:read_all";

/// What the provider sent back to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Code(String),
    Denied(String),
}

#[derive(Clone)]
struct CallbackState {
    sender: mpsc::Sender<CallbackOutcome>,
}

pub fn routes(sender: mpsc::Sender<CallbackOutcome>) -> Router {
    Router::new()
        .route("/auth/callback", get(auth_callback))
        .with_state(CallbackState { sender })
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

async fn auth_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Result<(StatusCode, Html<String>)> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        deliver(&state, CallbackOutcome::Denied(error.clone()));
        return Ok((
            StatusCode::BAD_REQUEST,
            Html(format!(
                "<h1>Authorization failed</h1><p>Strava reported: {}</p>",
                escape_html(&error)
            )),
        ));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Html("<h1>Missing authorization code</h1>".to_string()),
        ));
    };

    if let Some(scope) = params.scope.as_deref() {
        if !scope.split(',').any(|s| s == REQUIRED_SCOPE) {
            tracing::warn!(scope, "Activity read scope was not granted");
        }
    }

    if deliver(&state, CallbackOutcome::Code(code)) {
        tracing::info!("Received authorization code");
    }

    Ok((
        StatusCode::OK,
        Html("<h1>Connected to Strava</h1><p>You can close this window.</p>".to_string()),
    ))
}

/// Hand the outcome to the login flow without waiting. Only the first
/// redirect counts; repeats (browser reloads) and late arrivals are dropped.
fn deliver(state: &CallbackState, outcome: CallbackOutcome) -> bool {
    match state.sender.try_send(outcome) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!("Ignoring repeated OAuth redirect");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::warn!("OAuth redirect arrived after the login flow stopped waiting");
            false
        }
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Pull the authorization code out of a pasted redirect URL.
///
/// Accepts web redirects and custom-scheme deep links
/// (`myapp://auth/callback?code=...`). Input that is not a URL is taken to be
/// the bare code.
pub fn extract_authorization_code(input: &str) -> Result<String> {
    let input = input.trim();

    let Ok(url) = url::Url::parse(input) else {
        if input.is_empty() {
            return Err(AppError::AuthenticationFailed(
                "Missing authorization code".to_string(),
            ));
        }
        return Ok(input.to_string());
    };

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match &*key {
            "error" => {
                return Err(AppError::AuthenticationFailed(format!(
                    "Authorization denied: {}",
                    value
                )))
            }
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| {
        AppError::AuthenticationFailed("Redirect URL has no authorization code".to_string())
    })
}
