//! Decoded live-feed data and the store that publishes it.
//!
//! A [`Snapshot`] is immutable once published. The [`SnapshotStore`] holds
//! the latest one behind an atomically replaceable handle: readers either
//! see the previous snapshot or the fully constructed next one, never a mix
//! of fields from two publishes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Passenger load reported by the feed, when the operator provides it.
/// Serialized as its numeric feed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Empty = 0,
    ManySeatsAvailable = 1,
    FewSeatsAvailable = 2,
    StandingRoomOnly = 3,
    CrushedStandingRoomOnly = 4,
    Full = 5,
    NotAcceptingPassengers = 6,
}

impl TryFrom<i32> for Occupancy {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(Occupancy::Empty),
            1 => Ok(Occupancy::ManySeatsAvailable),
            2 => Ok(Occupancy::FewSeatsAvailable),
            3 => Ok(Occupancy::StandingRoomOnly),
            4 => Ok(Occupancy::CrushedStandingRoomOnly),
            5 => Ok(Occupancy::Full),
            6 => Ok(Occupancy::NotAcceptingPassengers),
            other => Err(other),
        }
    }
}

impl Serialize for Occupancy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// One vehicle's position report from the vehicle-position feed.
#[derive(Debug, Clone)]
pub struct VehicleReport {
    pub service_id: String,
    pub trip_id: String,
    pub start_time: String,
    pub start_date: String,
    pub lat: f64,
    pub lon: f64,
    /// Measurement time, epoch seconds.
    pub reported_at: u64,
    pub vehicle_id: String,
    pub occupancy: Option<Occupancy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopTimeUpdateReport {
    /// Predicted arrival, epoch seconds.
    pub arrival: i64,
    /// Predicted departure, epoch seconds.
    pub departure: i64,
    #[serde(rename = "sequence_id")]
    pub stop_sequence: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripUpdateReport {
    pub trip_id: String,
    pub start_time: String,
    pub start_date: String,
    pub stopping_pattern: Vec<StopTimeUpdateReport>,
}

/// One feed's decoded reports plus the upstream header timestamp. The two
/// feeds are held in separate frames so they can age independently when one
/// refresh fails.
#[derive(Debug, Clone)]
pub struct FeedFrame<T> {
    pub feed_timestamp: u64,
    pub reports: Vec<T>,
}

impl<T> Default for FeedFrame<T> {
    fn default() -> Self {
        Self {
            feed_timestamp: 0,
            reports: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub vehicles: FeedFrame<VehicleReport>,
    pub trip_updates: FeedFrame<TripUpdateReport>,
}

/// Holds the latest published [`Snapshot`]. The lock guards only the handle
/// swap and clone, never fetch or decode work, so readers do not queue
/// behind the poller.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replaces the current snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        let mut slot = self.current.write().expect("snapshot lock poisoned");
        *slot = Some(Arc::new(snapshot));
    }

    /// The latest published snapshot, or `None` strictly before the first
    /// publish. Callers must surface `None` as "not yet available", distinct
    /// from a snapshot with zero vehicles.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().expect("snapshot lock poisoned").clone()
    }
}
