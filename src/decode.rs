//! Protobuf decode of the upstream GTFS Realtime feeds and conversion into
//! the report types held by a snapshot.

use anyhow::Result;
use gtfs_realtime::FeedMessage;
use prost::Message;

use crate::snapshot::{
    Occupancy, StopTimeUpdateReport, TripUpdateReport, VehicleReport,
};

/// Decodes a protobuf-encoded [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}

pub fn header_timestamp(feed: &FeedMessage) -> u64 {
    feed.header.timestamp.unwrap_or(0)
}

/// Extracts one [`VehicleReport`] per feed entity carrying a positioned
/// vehicle. Entities without a position are skipped; absent descriptor
/// fields fall back to their protobuf defaults, as the upstream feed leaves
/// unset strings empty rather than omitting the entity.
pub fn vehicle_reports(feed: &FeedMessage) -> Vec<VehicleReport> {
    let mut reports = Vec::new();

    for entity in &feed.entity {
        let Some(vehicle) = &entity.vehicle else {
            continue;
        };
        let Some(position) = &vehicle.position else {
            continue;
        };
        let trip = vehicle.trip.as_ref();

        reports.push(VehicleReport {
            service_id: entity.id.clone(),
            trip_id: trip.and_then(|t| t.trip_id.clone()).unwrap_or_default(),
            start_time: trip.and_then(|t| t.start_time.clone()).unwrap_or_default(),
            start_date: trip.and_then(|t| t.start_date.clone()).unwrap_or_default(),
            lat: position.latitude as f64,
            lon: position.longitude as f64,
            reported_at: vehicle.timestamp.unwrap_or(0),
            vehicle_id: vehicle
                .vehicle
                .as_ref()
                .and_then(|v| v.id.clone())
                .unwrap_or_default(),
            occupancy: vehicle
                .occupancy_status
                .and_then(|raw| Occupancy::try_from(raw).ok()),
        });
    }

    reports
}

/// Extracts one [`TripUpdateReport`] per feed entity carrying a trip update,
/// preserving the feed's stop-time ordering.
pub fn trip_update_reports(feed: &FeedMessage) -> Vec<TripUpdateReport> {
    let mut reports = Vec::new();

    for entity in &feed.entity {
        let Some(update) = &entity.trip_update else {
            continue;
        };

        let stopping_pattern = update
            .stop_time_update
            .iter()
            .map(|stu| StopTimeUpdateReport {
                arrival: stu.arrival.as_ref().and_then(|e| e.time).unwrap_or(0),
                departure: stu.departure.as_ref().and_then(|e| e.time).unwrap_or(0),
                stop_sequence: stu.stop_sequence.unwrap_or(0),
            })
            .collect();

        reports.push(TripUpdateReport {
            trip_id: update.trip.trip_id.clone().unwrap_or_default(),
            start_time: update.trip.start_time.clone().unwrap_or_default(),
            start_date: update.trip.start_date.clone().unwrap_or_default(),
            stopping_pattern,
        });
    }

    reports
}
