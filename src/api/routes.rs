use actix_web::{HttpResponse, get, web};
use serde::Serialize;

use crate::error::ApiError;
use crate::estimate::{estimate_position, resolve_current_stop, resolve_next_stop};
use crate::schedule::{ScheduleIndex, ServiceTime};
use crate::snapshot::{Occupancy, SnapshotStore, TripUpdateReport};

#[derive(Debug, Serialize)]
struct StopOut {
    name: String,
    /// `[lon, lat]`, GeoJSON axis order.
    coords: [f64; 2],
    station_id: String,
}

#[derive(Debug, Serialize)]
struct StopsResponse {
    stop_list: Vec<StopOut>,
}

#[get("/stops")]
pub async fn get_stops(index: web::Data<ScheduleIndex>) -> HttpResponse {
    let stop_list = index
        .stops()
        .map(|s| StopOut {
            name: s.name.clone(),
            coords: [s.lon, s.lat],
            station_id: s.stop_id.clone(),
        })
        .collect();
    HttpResponse::Ok().json(StopsResponse { stop_list })
}

#[derive(Debug, Serialize)]
struct TripShapeResponse {
    shape_file: Vec<[f64; 2]>,
    stations: Vec<String>,
}

/// Route polyline and stop-id sequence for a trip. A known trip with no
/// matching shape returns an empty `shape_file`, not an error.
#[get("/shape/{trip_id}")]
pub async fn get_shape(
    index: web::Data<ScheduleIndex>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip_id = path.into_inner();
    let entry = index
        .trip(&trip_id)
        .ok_or_else(|| ApiError::TripNotFound(trip_id.clone()))?;

    let shape_file = index
        .geometry_for_trip(&trip_id)
        .iter()
        .map(|p| [p.lon, p.lat])
        .collect();
    let stations = entry.stops.iter().map(|s| s.stop_id.clone()).collect();

    Ok(HttpResponse::Ok().json(TripShapeResponse { shape_file, stations }))
}

#[derive(Debug, Serialize)]
struct TripStopOut {
    stop_id: String,
    arrival_time: ServiceTime,
}

#[derive(Debug, Serialize)]
struct TripInfoResponse {
    trip_id: String,
    stops: Vec<TripStopOut>,
}

#[get("/stops/stop_times/{trip_id}")]
pub async fn get_stop_times(
    index: web::Data<ScheduleIndex>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip_id = path.into_inner();
    let entry = index
        .trip(&trip_id)
        .ok_or_else(|| ApiError::TripNotFound(trip_id.clone()))?;

    let stops = entry
        .stops
        .iter()
        .map(|s| TripStopOut {
            stop_id: s.stop_id.clone(),
            arrival_time: s.arrival,
        })
        .collect();

    Ok(HttpResponse::Ok().json(TripInfoResponse { trip_id, stops }))
}

#[derive(Debug, Serialize)]
pub struct ServiceOut {
    pub service_id: String,
    pub trip_id: String,
    pub start_time: String,
    pub start_date: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: u64,
    pub vehicle_id: String,
    pub occupancy: Option<Occupancy>,
    pub next_stop: Option<String>,
    pub arrival: Option<ServiceTime>,
}

#[derive(Debug, Serialize)]
pub struct RealtimePayload {
    pub timestamp: u64,
    pub services: Vec<ServiceOut>,
}

/// The `/realtime` body: every vehicle report in the current snapshot,
/// merged with the upcoming station resolved from the static schedule.
/// Shared with the websocket push stream.
pub fn realtime_payload(
    index: &ScheduleIndex,
    store: &SnapshotStore,
    now: ServiceTime,
) -> Result<RealtimePayload, ApiError> {
    let snapshot = store.current().ok_or(ApiError::NotYetReady)?;

    let services = snapshot
        .vehicles
        .reports
        .iter()
        .map(|v| {
            let next = index
                .trip(&v.trip_id)
                .and_then(|entry| {
                    resolve_next_stop(&entry.stops, now).map(|n| (entry, n))
                })
                .map(|(entry, n)| {
                    let stop_id = &entry.stops[n.index].stop_id;
                    let name = index
                        .stop(stop_id)
                        .map(|s| s.name.clone())
                        .unwrap_or_else(|| stop_id.clone());
                    (name, n.arrival)
                });

            ServiceOut {
                service_id: v.service_id.clone(),
                trip_id: v.trip_id.clone(),
                start_time: v.start_time.clone(),
                start_date: v.start_date.clone(),
                latitude: v.lat,
                longitude: v.lon,
                timestamp: v.reported_at,
                vehicle_id: v.vehicle_id.clone(),
                occupancy: v.occupancy,
                next_stop: next.as_ref().map(|(name, _)| name.clone()),
                arrival: next.map(|(_, arrival)| arrival),
            }
        })
        .collect();

    Ok(RealtimePayload {
        timestamp: snapshot.vehicles.feed_timestamp,
        services,
    })
}

#[get("/realtime")]
pub async fn get_realtime(
    index: web::Data<ScheduleIndex>,
    store: web::Data<SnapshotStore>,
) -> Result<HttpResponse, ApiError> {
    let payload = realtime_payload(&index, &store, ServiceTime::now())?;
    Ok(HttpResponse::Ok().json(payload))
}

#[derive(Debug, Serialize)]
struct TripUpdatesResponse<'a> {
    timestamp: u64,
    trips: &'a [TripUpdateReport],
}

#[get("/trip_update")]
pub async fn get_trip_update(store: web::Data<SnapshotStore>) -> Result<HttpResponse, ApiError> {
    let snapshot = store.current().ok_or(ApiError::NotYetReady)?;
    Ok(HttpResponse::Ok().json(TripUpdatesResponse {
        timestamp: snapshot.trip_updates.feed_timestamp,
        trips: &snapshot.trip_updates.reports,
    }))
}

#[derive(Debug, Serialize)]
struct StationOut {
    station_id: String,
    name: String,
    /// Absent when the stop id has no record in the stops table.
    coords: Option<[f64; 2]>,
}

#[derive(Debug, Serialize)]
struct CurrentStationResponse {
    completed: bool,
    stop: StationOut,
}

#[get("/current_station/{trip_id}")]
pub async fn get_current_station(
    index: web::Data<ScheduleIndex>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip_id = path.into_inner();
    let entry = index
        .trip(&trip_id)
        .ok_or_else(|| ApiError::TripNotFound(trip_id.clone()))?;
    let current = resolve_current_stop(&entry.stops, ServiceTime::now())
        .ok_or_else(|| ApiError::TripNotFound(trip_id.clone()))?;

    let stop_id = &entry.stops[current.index].stop_id;
    let record = index.stop(stop_id);

    Ok(HttpResponse::Ok().json(CurrentStationResponse {
        completed: current.completed,
        stop: StationOut {
            station_id: stop_id.clone(),
            name: record
                .map(|s| s.name.clone())
                .unwrap_or_else(|| stop_id.clone()),
            coords: record.map(|s| [s.lon, s.lat]),
        },
    }))
}

#[derive(Debug, Serialize)]
struct NextStationResponse {
    /// Both fields are null once the trip is complete.
    next_stop: Option<String>,
    arrival: Option<ServiceTime>,
}

#[get("/next_station/{trip_id}")]
pub async fn get_next_station(
    index: web::Data<ScheduleIndex>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip_id = path.into_inner();
    let entry = index
        .trip(&trip_id)
        .ok_or_else(|| ApiError::TripNotFound(trip_id.clone()))?;

    let response = match resolve_next_stop(&entry.stops, ServiceTime::now()) {
        Some(next) => {
            let stop_id = &entry.stops[next.index].stop_id;
            NextStationResponse {
                next_stop: Some(
                    index
                        .stop(stop_id)
                        .map(|s| s.name.clone())
                        .unwrap_or_else(|| stop_id.clone()),
                ),
                arrival: Some(next.arrival),
            }
        }
        None => NextStationResponse {
            next_stop: None,
            arrival: None,
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

#[derive(Debug, Serialize)]
struct EstServiceOut {
    trip_id: String,
    start_time: String,
    coords: [f64; 2],
}

#[derive(Debug, Serialize)]
struct EstRealtimeResponse {
    timestamp: u64,
    services: Vec<EstServiceOut>,
}

/// Schedule-interpolated positions for every trip in the current trip-update
/// feed whose schedule and geometry are known. Used when the position feed
/// has no GPS report for a running trip.
#[get("/est_realtime")]
pub async fn get_est_realtime(
    index: web::Data<ScheduleIndex>,
    store: web::Data<SnapshotStore>,
) -> Result<HttpResponse, ApiError> {
    let snapshot = store.current().ok_or(ApiError::NotYetReady)?;
    let now = ServiceTime::now();

    let services = snapshot
        .trip_updates
        .reports
        .iter()
        .filter_map(|report| {
            let entry = index.trip(&report.trip_id)?;
            let shape = index.geometry_for_trip(&report.trip_id);
            let point = estimate_position(&entry.stops, shape, now)?;
            Some(EstServiceOut {
                trip_id: report.trip_id.clone(),
                start_time: report.start_time.clone(),
                coords: [point.lon, point.lat],
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(EstRealtimeResponse {
        timestamp: snapshot.trip_updates.feed_timestamp,
        services,
    }))
}

#[derive(Debug, Serialize)]
struct TrainLineResponse {
    trip_id: String,
    line_name: String,
}

#[get("/train_line/{trip_id}")]
pub async fn get_train_line(
    index: web::Data<ScheduleIndex>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip_id = path.into_inner();
    let route = index
        .route_for_trip(&trip_id)
        .ok_or_else(|| ApiError::LineNotFound(trip_id.clone()))?;

    Ok(HttpResponse::Ok().json(TrainLineResponse {
        trip_id,
        line_name: route.long_name.clone(),
    }))
}
