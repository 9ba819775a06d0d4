// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod coordinate;
pub mod credential;

pub use activity::{ActivityCache, ActivityMap, ActivityStream, StravaActivity, StreamSet};
pub use coordinate::Coordinate;
pub use credential::{OAuthCredential, TokenRequest, TokenResponse};
