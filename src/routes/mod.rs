// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers for the local OAuth callback listener.

pub mod callback;

pub use callback::{extract_authorization_code, CallbackOutcome};

use axum::Router;
use tokio::sync::mpsc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Build the callback listener router.
pub fn create_router(sender: mpsc::Sender<CallbackOutcome>) -> Router {
    Router::new().merge(callback::routes(sender)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}
