//! End-to-end exercise of the schedule index and estimation engine against
//! a small fixture timetable written as real GTFS tables.

use metro_live::estimate::{estimate_position, resolve_current_stop, resolve_next_stop};
use metro_live::schedule::{ScheduleIndex, ServiceTime, derive_shape_id};
use std::fs;
use std::path::PathBuf;

const TRIP: &str = "5.T3.2-PKM-vic-2.1.H";

/// Writes the fixture tables into a fresh temp directory. Stop-time and
/// shape rows are deliberately shuffled: the loader must order them by
/// their sequence columns, not by file position.
fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("metro_live_fixture_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    fs::write(
        dir.join("stops.txt"),
        "stop_id,stop_name,stop_lat,stop_lon\n\
         S1,Flinders Street,-37.8183,144.9671\n\
         S2,Richmond,-37.8240,144.9900\n\
         S3,South Yarra,-37.8380,144.9920\n",
    )
    .unwrap();

    fs::write(
        dir.join("stop_times.txt"),
        format!(
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             {TRIP},08:12:00,08:12:00,S3,3\n\
             {TRIP},08:00:00,08:00:00,S1,1\n\
             {TRIP},08:05:00,08:05:00,S2,2\n"
        ),
    )
    .unwrap();

    fs::write(
        dir.join("shapes.txt"),
        "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n\
         2-PKM-vic-2.1.H,-37.8380,144.9920,3\n\
         2-PKM-vic-2.1.H,-37.8183,144.9671,1\n\
         2-PKM-vic-2.1.H,-37.8240,144.9900,2\n",
    )
    .unwrap();

    fs::write(
        dir.join("routes.txt"),
        "route_id,agency_id,route_short_name,route_long_name\n\
         2-PKM,1,,Pakenham Line\n",
    )
    .unwrap();

    dir
}

fn at(hms: &str) -> ServiceTime {
    hms.parse().unwrap()
}

#[test]
fn test_loader_orders_rows_by_sequence_columns() {
    let dir = fixture_dir("ordering");
    let index = ScheduleIndex::load(&dir).unwrap();

    let entry = index.trip(TRIP).unwrap();
    let ids: Vec<_> = entry.stops.iter().map(|s| s.stop_id.as_str()).collect();
    assert_eq!(ids, ["S1", "S2", "S3"]);
    assert_eq!(entry.stops[0].arrival, at("08:00:00"));
    assert_eq!(entry.stops[2].arrival, at("08:12:00"));

    let shape = index.geometry_for_trip(TRIP);
    assert_eq!(shape.len(), 3);
    // First point must be the sequence-1 row, not the first file row.
    assert!((shape[0].lat - -37.8183).abs() < 1e-6);
    assert!((shape[2].lat - -37.8380).abs() < 1e-6);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_mid_trip_scenario() {
    let dir = fixture_dir("mid_trip");
    let index = ScheduleIndex::load(&dir).unwrap();
    let entry = index.trip(TRIP).unwrap();
    let now = at("08:06:00");

    let current = resolve_current_stop(&entry.stops, now).unwrap();
    assert_eq!(entry.stops[current.index].stop_id, "S2");
    assert!(!current.completed);

    let next = resolve_next_stop(&entry.stops, now).unwrap();
    assert_eq!(entry.stops[next.index].stop_id, "S3");
    assert_eq!(next.arrival, at("08:12:00"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_completed_trip_scenario() {
    let dir = fixture_dir("completed");
    let index = ScheduleIndex::load(&dir).unwrap();
    let entry = index.trip(TRIP).unwrap();
    let now = at("08:13:00");

    let current = resolve_current_stop(&entry.stops, now).unwrap();
    assert_eq!(entry.stops[current.index].stop_id, "S3");
    assert!(current.completed);
    assert!(resolve_next_stop(&entry.stops, now).is_none());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_shape_derivation_and_interpolation() {
    let dir = fixture_dir("interpolation");
    let index = ScheduleIndex::load(&dir).unwrap();
    let entry = index.trip(TRIP).unwrap();

    assert_eq!(derive_shape_id(TRIP), "2-PKM-vic-2.1.H");
    let shape = index.geometry_for_trip(TRIP);

    let start = estimate_position(&entry.stops, shape, at("08:00:00")).unwrap();
    assert!((start.lon - 144.9671).abs() < 1e-6);

    let end = estimate_position(&entry.stops, shape, at("08:12:00")).unwrap();
    assert!((end.lon - 144.9920).abs() < 1e-6);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_unknown_lookups() {
    let dir = fixture_dir("unknown");
    let index = ScheduleIndex::load(&dir).unwrap();

    assert!(index.trip("9.T9.2-XYZ-vic-9.9.H").is_none());
    // Trip known / geometry unknown is a degraded case, not an error.
    assert!(index.geometry("2-XYZ-vic-9.9.H").is_empty());

    let route = index.route_for_trip(TRIP).unwrap();
    assert_eq!(route.long_name, "Pakenham Line");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_table_is_a_load_error() {
    let dir = fixture_dir("missing_table");
    fs::remove_file(dir.join("stop_times.txt")).unwrap();

    assert!(ScheduleIndex::load(&dir).is_err());

    fs::remove_dir_all(&dir).unwrap();
}
