// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Atlas: client-side Strava integration for activity maps
//!
//! This crate signs in to Strava with OAuth2, keeps the athlete's activity
//! history in a time-bounded local cache, and decodes activity polylines
//! into coordinates for map rendering.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
