// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Command-line interface definition.

use clap::{Parser, Subcommand};

use strava_atlas::models::Coordinate;
use strava_atlas::services::polyline::DEFAULT_PRECISION;

/// strava-atlas - Strava activity history and routes from the terminal
#[derive(Debug, Parser)]
#[command(name = "strava-atlas")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the Strava authorization URL
    AuthUrl,

    /// Authorize in the browser and capture the redirect locally
    Login {
        /// Seconds to wait for the browser redirect
        #[arg(long, default_value = "300")]
        timeout: u64,
    },

    /// Complete sign-in with a code or the full redirect URL
    Exchange {
        /// Authorization code, or the URL Strava redirected to
        code: String,
    },

    /// Refresh the access token now
    Refresh,

    /// Show sign-in and cache state
    Status,

    /// List the activity history (cached for an hour)
    Activities {
        /// Ignore the cache and fetch everything again
        #[arg(long)]
        refresh: bool,
    },

    /// Show one activity
    Activity { id: u64 },

    /// Show streams for one activity
    Streams {
        id: u64,

        /// Stream types, comma separated
        #[arg(long, value_delimiter = ',', default_value = "latlng,altitude,time")]
        types: Vec<String>,
    },

    /// Decode an encoded polyline into coordinates
    Decode {
        polyline: String,

        #[arg(long, default_value_t = DEFAULT_PRECISION)]
        precision: u32,

        /// Reject malformed input instead of decoding it permissively
        #[arg(long)]
        strict: bool,
    },

    /// Encode `lat,lng` pairs into a polyline
    Encode {
        #[arg(required = true, allow_hyphen_values = true, value_parser = parse_coordinate)]
        points: Vec<Coordinate>,

        #[arg(long, default_value_t = DEFAULT_PRECISION)]
        precision: u32,
    },

    /// Forget the credential and the activity cache
    Logout,
}

fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lng but got {:?}", s))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad latitude {:?}: {}", lat, e))?;
    let lng = lng
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad longitude {:?}: {}", lng, e))?;
    Ok(Coordinate::new(lat, lng))
}
