//! Position and stop-progress estimation over a trip's stop sequence.
//!
//! All functions here are pure and total over their inputs: degenerate cases
//! (trip not started, trip finished, zero-duration trip, missing geometry)
//! have defined outputs rather than error returns.

use crate::schedule::{ServiceTime, ShapePoint, TripStopTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentStop {
    /// Index into the trip's stop sequence of the last stop already reached,
    /// clamped to 0 for a trip that has not started.
    pub index: usize,
    /// True once the last stop's arrival time has passed.
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextStop {
    /// Index into the trip's stop sequence of the first stop not yet reached.
    pub index: usize,
    pub arrival: ServiceTime,
}

/// First stop whose arrival `now` has not passed, or the final index.
fn scan(stops: &[TripStopTime], now: ServiceTime) -> usize {
    let mut i = 0;
    while i + 1 < stops.len() && now > stops[i].arrival {
        i += 1;
    }
    i
}

/// The stop the vehicle was most recently due at. `None` only for an empty
/// sequence, which the index builder never produces.
pub fn resolve_current_stop(stops: &[TripStopTime], now: ServiceTime) -> Option<CurrentStop> {
    if stops.is_empty() {
        return None;
    }
    let i = scan(stops, now);
    let reached = now > stops[i].arrival;
    Some(CurrentStop {
        index: if reached { i } else { i.saturating_sub(1) },
        completed: reached && i == stops.len() - 1,
    })
}

/// The stop the vehicle will reach next. The final stop counts as "next"
/// until its own arrival passes; after that the trip is complete and the
/// result is `None` — an expected outcome, not an error.
pub fn resolve_next_stop(stops: &[TripStopTime], now: ServiceTime) -> Option<NextStop> {
    if stops.is_empty() {
        return None;
    }
    let i = scan(stops, now);
    if i == stops.len() - 1 && now > stops[i].arrival {
        return None;
    }
    Some(NextStop {
        index: i,
        arrival: stops[i].arrival,
    })
}

/// Best-effort position along the route when no GPS report is available:
/// fractional time progress through the schedule mapped linearly onto the
/// shape's point sequence. No arc-length weighting.
pub fn estimate_position(
    stops: &[TripStopTime],
    shape: &[ShapePoint],
    now: ServiceTime,
) -> Option<ShapePoint> {
    let first = stops.first()?.arrival;
    let last = stops.last()?.arrival;
    if shape.is_empty() {
        return None;
    }

    // A zero-duration trip pins progress to the origin rather than dividing
    // by zero.
    let progress = if last <= first {
        0.0
    } else {
        let span = (last.seconds() - first.seconds()) as f64;
        let elapsed = now.seconds().saturating_sub(first.seconds()) as f64;
        (elapsed / span).clamp(0.0, 1.0)
    };

    let index = ((progress * shape.len() as f64) as usize).min(shape.len() - 1);
    Some(shape[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(stop_id: &str, arrival: &str) -> TripStopTime {
        TripStopTime {
            stop_id: stop_id.to_string(),
            arrival: arrival.parse().unwrap(),
        }
    }

    fn pakenham_run() -> Vec<TripStopTime> {
        vec![
            stop("S1", "08:00:00"),
            stop("S2", "08:05:00"),
            stop("S3", "08:12:00"),
        ]
    }

    fn at(hms: &str) -> ServiceTime {
        hms.parse().unwrap()
    }

    #[test]
    fn test_mid_trip_current_and_next() {
        let stops = pakenham_run();
        let now = at("08:06:00");

        let current = resolve_current_stop(&stops, now).unwrap();
        assert_eq!(current.index, 1); // S2 reached, S3 ahead
        assert!(!current.completed);

        let next = resolve_next_stop(&stops, now).unwrap();
        assert_eq!(next.index, 2);
        assert_eq!(next.arrival, at("08:12:00"));
    }

    #[test]
    fn test_completed_trip() {
        let stops = pakenham_run();
        let now = at("08:13:00");

        let current = resolve_current_stop(&stops, now).unwrap();
        assert_eq!(current.index, 2); // S3
        assert!(current.completed);

        assert!(resolve_next_stop(&stops, now).is_none());
    }

    #[test]
    fn test_trip_not_started_clamps_to_first_stop() {
        let stops = pakenham_run();
        let now = at("07:30:00");

        let current = resolve_current_stop(&stops, now).unwrap();
        assert_eq!(current.index, 0);
        assert!(!current.completed);

        let next = resolve_next_stop(&stops, now).unwrap();
        assert_eq!(next.index, 0);
    }

    #[test]
    fn test_final_stop_is_next_until_its_arrival_passes() {
        let stops = pakenham_run();
        let now = at("08:12:00"); // exactly the last arrival

        let next = resolve_next_stop(&stops, now).unwrap();
        assert_eq!(next.index, 2);
        assert!(!resolve_current_stop(&stops, now).unwrap().completed);
    }

    #[test]
    fn test_exactly_one_of_next_or_completed_holds() {
        let stops = pakenham_run();
        for now_secs in (7 * 3600u32)..(9 * 3600) {
            let now = ServiceTime::from_hms(now_secs / 3600, (now_secs % 3600) / 60, now_secs % 60);
            let current = resolve_current_stop(&stops, now).unwrap();
            let next = resolve_next_stop(&stops, now);
            assert_ne!(next.is_some(), current.completed, "at {now}");
            if let Some(next) = next {
                assert!(current.index <= next.index, "at {now}");
            }
        }
    }

    #[test]
    fn test_single_stop_trip() {
        let stops = vec![stop("S1", "08:00:00")];

        let before = resolve_current_stop(&stops, at("07:59:00")).unwrap();
        assert_eq!(before.index, 0);
        assert!(!before.completed);
        assert!(resolve_next_stop(&stops, at("07:59:00")).is_some());

        let after = resolve_current_stop(&stops, at("08:01:00")).unwrap();
        assert_eq!(after.index, 0);
        assert!(after.completed);
        assert!(resolve_next_stop(&stops, at("08:01:00")).is_none());
    }

    #[test]
    fn test_empty_sequence_resolves_to_none() {
        assert!(resolve_current_stop(&[], at("08:00:00")).is_none());
        assert!(resolve_next_stop(&[], at("08:00:00")).is_none());
    }

    fn line(points: usize) -> Vec<ShapePoint> {
        (0..points)
            .map(|i| ShapePoint {
                lon: i as f64,
                lat: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_estimate_position_endpoints() {
        let stops = pakenham_run();
        let shape = line(10);

        // now == first arrival: progress 0, origin point
        let start = estimate_position(&stops, &shape, at("08:00:00")).unwrap();
        assert_eq!(start.lon, 0.0);

        // now == last arrival: progress 1, clamped to the final point
        let end = estimate_position(&stops, &shape, at("08:12:00")).unwrap();
        assert_eq!(end.lon, 9.0);
    }

    #[test]
    fn test_estimate_position_clamps_outside_the_trip_window() {
        let stops = pakenham_run();
        let shape = line(10);

        let before = estimate_position(&stops, &shape, at("06:00:00")).unwrap();
        assert_eq!(before.lon, 0.0);

        let after = estimate_position(&stops, &shape, at("11:00:00")).unwrap();
        assert_eq!(after.lon, 9.0);
    }

    #[test]
    fn test_estimate_position_midway() {
        let stops = vec![stop("A", "08:00:00"), stop("B", "08:10:00")];
        let shape = line(10);

        let midway = estimate_position(&stops, &shape, at("08:05:00")).unwrap();
        assert_eq!(midway.lon, 5.0);
    }

    #[test]
    fn test_estimate_position_zero_duration_trip_does_not_divide() {
        let stops = vec![stop("A", "08:00:00"), stop("B", "08:00:00")];
        let shape = line(4);

        let pt = estimate_position(&stops, &shape, at("08:00:00")).unwrap();
        assert_eq!(pt.lon, 0.0);
    }

    #[test]
    fn test_estimate_position_index_always_in_bounds() {
        let stops = pakenham_run();
        for len in 1..6 {
            let shape = line(len);
            for now_secs in [0u32, 28800, 29160, 29520, 86400, 90000] {
                let now = ServiceTime::from_hms(now_secs / 3600, (now_secs % 3600) / 60, 0);
                // Would panic on an out-of-bounds index
                estimate_position(&stops, &shape, now).unwrap();
            }
        }
    }

    #[test]
    fn test_estimate_position_missing_geometry_or_schedule() {
        let stops = pakenham_run();
        assert!(estimate_position(&stops, &[], at("08:06:00")).is_none());
        assert!(estimate_position(&[], &line(5), at("08:06:00")).is_none());
    }
}
