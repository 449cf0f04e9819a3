//! Background feed poller: fetch both upstream feeds, decode, publish.
//!
//! One cycle refreshes the vehicle-position and trip-update feeds
//! concurrently and publishes a single new snapshot. Each feed falls back to
//! its previous value independently on failure, so one broken upstream
//! never blanks the other's data.

use anyhow::Result;
use chrono::Utc;
use gtfs_realtime::FeedMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::decode;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::snapshot::{FeedFrame, Snapshot, SnapshotStore, TripUpdateReport, VehicleReport};

/// Payloads shorter than this cannot hold a populated feed message and are
/// treated as an empty/no-update response rather than decoded into a
/// degenerate snapshot that would wipe the previous good data.
const MIN_FEED_PAYLOAD_BYTES: usize = 20;

pub struct FeedEndpoints {
    pub vehicle_positions: String,
    pub trip_updates: String,
}

pub struct FeedPoller<C> {
    client: C,
    endpoints: FeedEndpoints,
    store: Arc<SnapshotStore>,
    // Single-flight gate: a tick that lands while a cycle is in flight is
    // skipped, not queued, so publishes can never interleave out of order.
    cycle_gate: tokio::sync::Mutex<()>,
}

impl<C: HttpClient> FeedPoller<C> {
    pub fn new(client: C, endpoints: FeedEndpoints, store: Arc<SnapshotStore>) -> Self {
        Self {
            client,
            endpoints,
            store,
            cycle_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs one fetch-decode-publish cycle. Returns whether a snapshot was
    /// published; `false` means the tick was skipped (cycle already in
    /// flight) or there was nothing publishable yet.
    #[tracing::instrument(skip(self))]
    pub async fn poll_once(&self) -> bool {
        let Ok(_guard) = self.cycle_gate.try_lock() else {
            debug!("poll cycle already in flight, skipping tick");
            return false;
        };

        let (vehicles, trip_updates) = tokio::join!(
            self.refresh("vehicle-positions", &self.endpoints.vehicle_positions, decode::vehicle_reports),
            self.refresh("trip-updates", &self.endpoints.trip_updates, decode::trip_update_reports),
        );

        let previous = self.store.current();
        match next_snapshot(previous.as_deref(), vehicles, trip_updates) {
            Some(snapshot) => {
                info!(
                    vehicles = snapshot.vehicles.reports.len(),
                    trip_updates = snapshot.trip_updates.reports.len(),
                    "Publishing snapshot"
                );
                self.store.publish(snapshot);
                true
            }
            None => false,
        }
    }

    /// Polls on a fixed cadence until the task is dropped at shutdown. A
    /// cycle slower than the interval skips the missed ticks instead of
    /// bursting to catch up.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately and the startup cycle has
        // already run; consume it so the loop waits a full interval.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    async fn refresh<T>(
        &self,
        feed: &str,
        url: &str,
        convert: impl Fn(&FeedMessage) -> Vec<T>,
    ) -> Result<FeedFrame<T>> {
        let bytes = fetch_bytes(&self.client, url).await?;
        if bytes.len() < MIN_FEED_PAYLOAD_BYTES {
            anyhow::bail!(
                "payload of {} bytes is implausibly short for a live feed",
                bytes.len()
            );
        }
        let message = decode::parse_feed(&bytes)?;
        let frame = FeedFrame {
            feed_timestamp: decode::header_timestamp(&message),
            reports: convert(&message),
        };
        debug!(feed, reports = frame.reports.len(), "Feed refreshed");
        Ok(frame)
    }
}

/// Combines this cycle's per-feed outcomes with the previous snapshot. A
/// failed feed retains its previous frame; with no previous snapshot and no
/// successful feed there is nothing to publish and the store must stay in
/// its "not yet available" state.
fn next_snapshot(
    previous: Option<&Snapshot>,
    vehicles: Result<FeedFrame<VehicleReport>>,
    trip_updates: Result<FeedFrame<TripUpdateReport>>,
) -> Option<Snapshot> {
    if vehicles.is_err() && trip_updates.is_err() && previous.is_none() {
        warn!("both feeds failed before any snapshot was published");
        return None;
    }

    let vehicles = match vehicles {
        Ok(frame) => frame,
        Err(e) => {
            warn!(feed = "vehicle-positions", error = %e, "Feed refresh failed, retaining previous data");
            previous.map(|p| p.vehicles.clone()).unwrap_or_default()
        }
    };
    let trip_updates = match trip_updates {
        Ok(frame) => frame,
        Err(e) => {
            warn!(feed = "trip-updates", error = %e, "Feed refresh failed, retaining previous data");
            previous.map(|p| p.trip_updates.clone()).unwrap_or_default()
        }
    };

    Some(Snapshot {
        captured_at: Utc::now(),
        vehicles,
        trip_updates,
    })
}
