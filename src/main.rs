// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Atlas command-line client
//!
//! Signs in to Strava, lists the cached activity history, and converts
//! activity polylines to and from coordinates.

mod cli;

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use strava_atlas::{
    config::Config,
    db::FileStore,
    error::{AppError, Result},
    models::{Coordinate, StravaActivity},
    routes::{self, CallbackOutcome},
    services::{polyline, ReqwestTransport, StravaClient, SystemClock},
};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Codec commands need no configuration or credentials.
    match &cli.command {
        Command::Decode {
            polyline: encoded,
            precision,
            strict,
        } => {
            let coordinates = if *strict {
                polyline::decode_strict(encoded, *precision)
                    .map_err(|e| AppError::Internal(e.into()))?
            } else {
                polyline::decode_with_precision(encoded, *precision)
            };
            return print_coordinates(&coordinates, cli.json);
        }
        Command::Encode { points, precision } => {
            println!("{}", polyline::encode_with_precision(points, *precision));
            return Ok(());
        }
        _ => {}
    }

    let config = Config::from_env()?;
    let store = FileStore::open(&config.store_path)?;
    tracing::debug!(path = %store.path().display(), "Using credential store");

    let client = StravaClient::new(
        config.strava(),
        Arc::new(ReqwestTransport::new()),
        Arc::new(store),
        Arc::new(SystemClock),
    )?;

    match cli.command {
        Command::AuthUrl => println!("{}", client.authorization_url()),
        Command::Login { timeout } => login(&client, &config, timeout).await?,
        Command::Exchange { code } => {
            let code = routes::extract_authorization_code(&code)?;
            client.exchange_code_for_token(&code).await?;
            println!("Signed in to Strava");
        }
        Command::Refresh => {
            client.refresh_token().await?;
            println!("Access token refreshed");
        }
        Command::Status => print_status(&client)?,
        Command::Activities { refresh } => {
            let activities = client.get_activities(refresh).await?;
            if cli.json {
                print_json(&activities)?;
            } else {
                for activity in &activities {
                    print_activity_line(activity);
                }
                println!("{} activities", activities.len());
            }
        }
        Command::Activity { id } => {
            let activity = client.get_activity(id).await?;
            if cli.json {
                print_json(&activity)?;
            } else {
                print_activity_line(&activity);
                println!("route: {} points", activity.route().len());
            }
        }
        Command::Streams { id, types } => {
            let types: Vec<&str> = types.iter().map(String::as_str).collect();
            let streams = client.get_activity_streams(id, &types).await?;
            if cli.json {
                print_json(&streams)?;
            } else {
                for (kind, stream) in &streams {
                    let samples = stream.data.as_array().map_or(0, Vec::len);
                    println!("{:<16} {} samples", kind, samples);
                }
            }
        }
        Command::Logout => {
            client.logout()?;
            println!("Signed out");
        }
        Command::Decode { .. } | Command::Encode { .. } => {}
    }

    Ok(())
}

/// Run the browser sign-in: listen on the callback port, wait for Strava's
/// redirect, then exchange the code.
async fn login(client: &StravaClient, config: &Config, timeout: u64) -> Result<()> {
    let (sender, mut receiver) = mpsc::channel(1);
    let app = routes::create_router(sender);

    let addr = format!("127.0.0.1:{}", config.callback_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Cannot listen on {}: {}", addr, e)))?;
    tracing::info!(address = %addr, "Callback listener ready");

    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    println!("Open this URL to connect Strava:\n\n  {}\n", client.authorization_url());

    let outcome = tokio::time::timeout(Duration::from_secs(timeout), receiver.recv()).await;
    server.abort();

    match outcome {
        Ok(Some(CallbackOutcome::Code(code))) => {
            client.exchange_code_for_token(&code).await?;
            println!("Signed in to Strava");
            Ok(())
        }
        Ok(Some(CallbackOutcome::Denied(reason))) => Err(AppError::AuthenticationFailed(
            format!("Authorization denied: {}", reason),
        )),
        Ok(None) => Err(AppError::Internal(anyhow::anyhow!(
            "Callback listener stopped unexpectedly"
        ))),
        Err(_) => Err(AppError::AuthenticationFailed(format!(
            "No redirect received within {} seconds",
            timeout
        ))),
    }
}

fn print_status(client: &StravaClient) -> Result<()> {
    match client.credential()? {
        Some(credential) => {
            let expires = chrono::DateTime::from_timestamp(credential.expires_at, 0)
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| credential.expires_at.to_string());
            println!("signed in, access token expires {}", expires);
        }
        None if client.is_authenticated() => println!("signed in, expiry unknown"),
        None => println!("signed out"),
    }

    match client.cached_activities() {
        Some(cache) => {
            let fetched = chrono::DateTime::from_timestamp(cache.fetched_at, 0)
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| cache.fetched_at.to_string());
            println!(
                "cache: {} activities fetched {}",
                cache.activities.len(),
                fetched
            );
        }
        None => println!("cache: empty"),
    }
    Ok(())
}

fn print_activity_line(activity: &StravaActivity) {
    println!(
        "{:>12}  {:<20}  {:<14}  {:>8.1} km  {}",
        activity.id,
        activity.start_date_local,
        activity.sport_type.as_deref().unwrap_or(&activity.activity_type),
        activity.distance / 1000.0,
        activity.name
    );
}

fn print_coordinates(coordinates: &[Coordinate], json: bool) -> Result<()> {
    if json {
        let pairs: Vec<(f64, f64)> = coordinates.iter().map(|&c| c.into()).collect();
        return print_json(&pairs);
    }
    for c in coordinates {
        println!("{},{}", c.lat, c.lng);
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to render JSON: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Initialize logging to stderr. `LOG_FORMAT=json` switches to JSON lines.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("strava_atlas=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
