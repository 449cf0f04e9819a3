//! Upstream feed configuration from the environment.

use anyhow::{Context, Result};
use std::env;

const DEFAULT_BASE_URL: &str = "https://data-exchange-api.vicroads.vic.gov.au";

pub struct Settings {
    pub vehicle_positions_url: String,
    pub trip_updates_url: String,
    pub subscription_key: String,
}

impl Settings {
    /// Reads feed endpoints and the subscription key. Each URL can be
    /// overridden individually; the key has no default and is required.
    pub fn from_env() -> Result<Self> {
        let base = env::var("FEED_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let vehicle_positions_url = env::var("VEHICLE_POSITIONS_URL").unwrap_or_else(|_| {
            format!("{base}/opendata/v1/gtfsr/metrotrain-vehicleposition-updates")
        });
        let trip_updates_url = env::var("TRIP_UPDATES_URL")
            .unwrap_or_else(|_| format!("{base}/opendata/v1/gtfsr/metrotrain-tripupdates"));

        let subscription_key = env::var("PrimaryKey")
            .context("PrimaryKey must be set (data exchange subscription key)")?;

        Ok(Self {
            vehicle_positions_url,
            trip_updates_url,
            subscription_key,
        })
    }
}
