//! Static schedule index: stops, per-trip stop sequences, route geometry.
//!
//! Built once at startup from the GTFS text tables and read-only for the
//! process lifetime. Stop sequences and shape polylines are sorted by their
//! sequence columns at load time; input row order is not trusted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Time of day on the service clock, in whole seconds since midnight.
///
/// GTFS arrival times can exceed 24:00:00 for post-midnight service, so this
/// is deliberately not a calendar time type: `25:10:00` must order after
/// `23:00:00` on the same service day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceTime(u32);

impl ServiceTime {
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        ServiceTime(hours * 3600 + minutes * 60 + seconds)
    }

    pub fn seconds(self) -> u32 {
        self.0
    }

    /// The current local time of day, for schedule comparisons against "now".
    pub fn now() -> Self {
        use chrono::Timelike;
        let t = chrono::Local::now().time();
        ServiceTime::from_hms(t.hour(), t.minute(), t.second())
    }
}

impl FromStr for ServiceTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let (h, m, sec) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(m), Some(sec)) => (h, m, sec),
            _ => anyhow::bail!("invalid HH:MM:SS time: {s:?}"),
        };
        let h: u32 = h.trim().parse().context("bad hours field")?;
        let m: u32 = m.parse().context("bad minutes field")?;
        let sec: u32 = sec.parse().context("bad seconds field")?;
        if m > 59 || sec > 59 {
            anyhow::bail!("invalid HH:MM:SS time: {s:?}");
        }
        Ok(ServiceTime::from_hms(h, m, sec))
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 % 3600) / 60,
            self.0 % 60
        )
    }
}

impl Serialize for ServiceTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone)]
pub struct Stop {
    pub stop_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone)]
pub struct TripStopTime {
    pub stop_id: String,
    pub arrival: ServiceTime,
}

/// One trip's stop sequence, ordered by `stop_sequence` ascending.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub trip_id: String,
    pub stops: Vec<TripStopTime>,
}

#[derive(Debug, Clone, Copy)]
pub struct ShapePoint {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub route_id: String,
    pub long_name: String,
}

/// Derives the shape id embedded in a trip id: the first two dot-separated
/// fields are a run number and service type, the rest is the shape id.
///
/// `derive_shape_id("5.T3.2-PKM-vic-2.1.H") == "2-PKM-vic-2.1.H"`
pub fn derive_shape_id(trip_id: &str) -> String {
    trip_id.split('.').skip(2).collect::<Vec<_>>().join(".")
}

// Raw table rows. Extra columns in the GTFS files are ignored by the csv
// reader; the named ones are required.

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    stop_name: String,
    stop_lat: f64,
    stop_lon: f64,
}

#[derive(Debug, Deserialize)]
struct StopTimeRow {
    trip_id: String,
    arrival_time: String,
    stop_id: String,
    stop_sequence: u32,
}

#[derive(Debug, Deserialize)]
struct ShapeRow {
    shape_id: String,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: u32,
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    route_id: String,
    route_long_name: String,
}

pub struct ScheduleIndex {
    stops: HashMap<String, Stop>,
    trips: HashMap<String, ScheduleEntry>,
    shapes: HashMap<String, Vec<ShapePoint>>,
    routes: Vec<Route>,
}

impl ScheduleIndex {
    /// Loads the index from the GTFS tables in `dir`. A missing or malformed
    /// table is a startup-fatal error; the caller must not serve without it.
    pub fn load(dir: &Path) -> Result<Self> {
        let stops = load_stops(&dir.join("stops.txt"))?;
        let trips = load_stop_times(&dir.join("stop_times.txt"))?;
        let shapes = load_shapes(&dir.join("shapes.txt"))?;
        let routes = load_routes(&dir.join("routes.txt"))?;

        info!(
            stops = stops.len(),
            trips = trips.len(),
            shapes = shapes.len(),
            routes = routes.len(),
            "Schedule index loaded"
        );

        Ok(Self {
            stops,
            trips,
            shapes,
            routes,
        })
    }

    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops.get(stop_id)
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    pub fn trip(&self, trip_id: &str) -> Option<&ScheduleEntry> {
        self.trips.get(trip_id)
    }

    /// The polyline for `shape_id`, empty if the shape is unknown. "Trip
    /// known, geometry unknown" is a valid degraded case, not an error: the
    /// static dataset carries stop times for some trips whose shapes are
    /// missing from the shapes table.
    pub fn geometry(&self, shape_id: &str) -> &[ShapePoint] {
        self.shapes.get(shape_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn geometry_for_trip(&self, trip_id: &str) -> &[ShapePoint] {
        self.geometry(&derive_shape_id(trip_id))
    }

    /// The route whose id appears within the trip id, if any. Route ids are
    /// embedded in trip ids rather than mapped through a trips table.
    pub fn route_for_trip(&self, trip_id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| trip_id.contains(&r.route_id))
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        stops: Vec<Stop>,
        trips: Vec<ScheduleEntry>,
        shapes: HashMap<String, Vec<ShapePoint>>,
        routes: Vec<Route>,
    ) -> Self {
        Self {
            stops: stops.into_iter().map(|s| (s.stop_id.clone(), s)).collect(),
            trips: trips.into_iter().map(|t| (t.trip_id.clone(), t)).collect(),
            shapes,
            routes,
        }
    }
}

fn load_stops(path: &Path) -> Result<HashMap<String, Stop>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut stops = HashMap::new();
    for row in reader.deserialize() {
        let row: StopRow = row.with_context(|| format!("reading {}", path.display()))?;
        stops.insert(
            row.stop_id.clone(),
            Stop {
                stop_id: row.stop_id,
                name: row.stop_name,
                lat: row.stop_lat,
                lon: row.stop_lon,
            },
        );
    }
    Ok(stops)
}

fn load_stop_times(path: &Path) -> Result<HashMap<String, ScheduleEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut grouped: HashMap<String, Vec<(u32, TripStopTime)>> = HashMap::new();
    for row in reader.deserialize() {
        let row: StopTimeRow = row.with_context(|| format!("reading {}", path.display()))?;
        let arrival: ServiceTime = row
            .arrival_time
            .parse()
            .with_context(|| format!("trip {}, stop {}", row.trip_id, row.stop_id))?;
        grouped.entry(row.trip_id).or_default().push((
            row.stop_sequence,
            TripStopTime {
                stop_id: row.stop_id,
                arrival,
            },
        ));
    }

    let mut trips = HashMap::new();
    for (trip_id, mut stops) in grouped {
        stops.sort_by_key(|(seq, _)| *seq);
        trips.insert(
            trip_id.clone(),
            ScheduleEntry {
                trip_id,
                stops: stops.into_iter().map(|(_, st)| st).collect(),
            },
        );
    }
    Ok(trips)
}

fn load_shapes(path: &Path) -> Result<HashMap<String, Vec<ShapePoint>>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut grouped: HashMap<String, Vec<(u32, ShapePoint)>> = HashMap::new();
    for row in reader.deserialize() {
        let row: ShapeRow = row.with_context(|| format!("reading {}", path.display()))?;
        grouped.entry(row.shape_id).or_default().push((
            row.shape_pt_sequence,
            ShapePoint {
                lon: row.shape_pt_lon,
                lat: row.shape_pt_lat,
            },
        ));
    }

    let mut shapes = HashMap::new();
    for (shape_id, mut points) in grouped {
        points.sort_by_key(|(seq, _)| *seq);
        shapes.insert(shape_id, points.into_iter().map(|(_, p)| p).collect());
    }
    Ok(shapes)
}

fn load_routes(path: &Path) -> Result<Vec<Route>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut routes = Vec::new();
    for row in reader.deserialize() {
        let row: RouteRow = row.with_context(|| format!("reading {}", path.display()))?;
        routes.push(Route {
            route_id: row.route_id,
            long_name: row.route_long_name,
        });
    }
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_time_parses_and_formats() {
        let t: ServiceTime = "08:05:30".parse().unwrap();
        assert_eq!(t.seconds(), 8 * 3600 + 5 * 60 + 30);
        assert_eq!(t.to_string(), "08:05:30");
    }

    #[test]
    fn test_service_time_past_midnight_orders_after_evening() {
        let evening: ServiceTime = "23:00:00".parse().unwrap();
        let late: ServiceTime = "25:10:00".parse().unwrap();
        assert!(late > evening);
        assert_eq!(late.to_string(), "25:10:00");
    }

    #[test]
    fn test_service_time_rejects_garbage() {
        assert!("".parse::<ServiceTime>().is_err());
        assert!("8:00".parse::<ServiceTime>().is_err());
        assert!("08:61:00".parse::<ServiceTime>().is_err());
        assert!("ab:cd:ef".parse::<ServiceTime>().is_err());
    }

    #[test]
    fn test_derive_shape_id_strips_run_and_service_fields() {
        assert_eq!(derive_shape_id("5.T3.2-PKM-vic-2.1.H"), "2-PKM-vic-2.1.H");
    }

    #[test]
    fn test_derive_shape_id_short_input() {
        // Fewer than three fields leaves nothing to join
        assert_eq!(derive_shape_id("5.T3"), "");
    }

    #[test]
    fn test_route_for_trip_matches_embedded_route_id() {
        let index = ScheduleIndex::from_parts(
            vec![],
            vec![],
            HashMap::new(),
            vec![
                Route {
                    route_id: "2-ABC".to_string(),
                    long_name: "Abbey Line".to_string(),
                },
                Route {
                    route_id: "2-PKM".to_string(),
                    long_name: "Pakenham Line".to_string(),
                },
            ],
        );

        let route = index.route_for_trip("5.T3.2-PKM-vic-2.1.H").unwrap();
        assert_eq!(route.long_name, "Pakenham Line");
        assert!(index.route_for_trip("5.T3.2-XYZ-vic-2.1.H").is_none());
    }

    #[test]
    fn test_geometry_unknown_shape_is_empty_not_error() {
        let index = ScheduleIndex::from_parts(vec![], vec![], HashMap::new(), vec![]);
        assert!(index.geometry("2-NOPE-vic-2.1.H").is_empty());
    }
}
