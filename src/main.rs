//! Service entry point for the metro live-position API.
//!
//! Loads the schedule index, runs one poll cycle so the first request has
//! real data, then serves the HTTP surface while the poller refreshes the
//! snapshot in the background.

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use metro_live::api;
use metro_live::config::Settings;
use metro_live::fetch::{BasicClient, auth::ApiKey};
use metro_live::poller::{FeedEndpoints, FeedPoller};
use metro_live::schedule::ScheduleIndex;
use metro_live::snapshot::SnapshotStore;

#[derive(Parser)]
#[command(name = "metro_live")]
#[command(about = "Live metro train position and schedule API", long_about = None)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Directory containing the GTFS schedule tables
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Seconds between feed poll cycles
    #[arg(long, default_value_t = 20)]
    poll_interval: u64,
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/metro_live.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("metro_live.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    // A missing or malformed schedule table is fatal: there is nothing
    // meaningful to serve without the index.
    let index = Arc::new(
        ScheduleIndex::load(&cli.data_dir)
            .with_context(|| format!("loading schedule tables from {}", cli.data_dir.display()))?,
    );
    let store = Arc::new(SnapshotStore::new());

    let client = ApiKey::subscription(BasicClient::new(), settings.subscription_key);
    let poller = Arc::new(FeedPoller::new(
        client,
        FeedEndpoints {
            vehicle_positions: settings.vehicle_positions_url,
            trip_updates: settings.trip_updates_url,
        },
        store.clone(),
    ));

    // One synchronous cycle before binding, so the first request sees real
    // data when upstream is healthy.
    if !poller.poll_once().await {
        warn!("initial poll cycle published nothing; serving 503 until a cycle succeeds");
    }
    tokio::spawn(
        poller
            .clone()
            .run(Duration::from_secs(cli.poll_interval)),
    );

    let index_data = web::Data::from(index);
    let store_data = web::Data::from(store);

    info!(bind = %cli.bind, "Starting HTTP server");
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(index_data.clone())
            .app_data(store_data.clone())
            .service(api::routes::get_stops)
            .service(api::routes::get_shape)
            .service(api::routes::get_stop_times)
            .service(api::routes::get_realtime)
            .service(api::routes::get_trip_update)
            .service(api::routes::get_current_station)
            .service(api::routes::get_next_station)
            .service(api::routes::get_est_realtime)
            .service(api::routes::get_train_line)
            .service(api::ws::realtime_ws)
    })
    .bind(&cli.bind)?
    .run()
    .await?;

    Ok(())
}
