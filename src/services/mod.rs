// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - Strava client, polyline codec, and their capabilities.

pub mod clock;
pub mod polyline;
pub mod strava;
pub mod transport;

pub use clock::{Clock, SystemClock};
pub use polyline::PolylineError;
pub use strava::{StravaClient, StravaConfig};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
