//! Thermal/cruise classification on synthetic tracks.
//!
//! Tracks are built by integrating a heading per second at a constant
//! airspeed, so circling and straight flight are exact.
//!
//! Run with: cargo test -p soar-core --test phases_test

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soar_core::spatial::{destination, Coordinate};
use soar_core::{
    AltitudeSource, ClassificationMethod, Fix, FlightPhases, LegSelection, Phase, RaceTask,
    ScoringError, ScoringRules, SectorOrientation, Task, TaskBase, Trip, Waypoint,
};

const SPEED_MS: f64 = 30.0;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn origin() -> Coordinate {
    Coordinate::new(52.0, 5.0)
}

/// One fix per second; `headings[i]` is flown between fix `i` and `i + 1`.
/// Altitude climbs 2 m/s while turning and sinks 1 m/s otherwise.
fn track(headings: &[f64], mut rng: Option<&mut StdRng>) -> Vec<Fix> {
    let mut position = origin();
    let mut altitude = 1000.0;
    let mut fixes = Vec::with_capacity(headings.len() + 1);
    let mut previous_heading = headings.first().copied().unwrap_or(90.0);

    for (second, &heading) in headings.iter().enumerate() {
        let mut recorded = position;
        if let Some(rng) = rng.as_deref_mut() {
            recorded = destination(position, rng.random_range(0.0..2.0), rng.random_range(0.0..360.0));
        }
        fixes.push(
            Fix::new(t0() + Duration::seconds(second as i64), recorded.lat, recorded.lon)
                .with_altitude(altitude, altitude),
        );

        altitude += if heading != previous_heading { 2.0 } else { -1.0 };
        previous_heading = heading;
        position = destination(position, SPEED_MS, heading);
    }
    fixes.push(
        Fix::new(t0() + Duration::seconds(headings.len() as i64), position.lat, position.lon)
            .with_altitude(altitude, altitude),
    );
    fixes
}

/// Two minutes east, five right-hand circles, two minutes east.
fn cruise_thermal_cruise() -> Vec<f64> {
    let mut headings = vec![90.0; 120];
    headings.extend((1..=100).map(|step| (90.0 + 18.0 * step as f64) % 360.0));
    headings.extend(vec![90.0; 120]);
    headings
}

fn pattern(phases: &[Phase]) -> Vec<bool> {
    phases.iter().map(|phase| phase.is_cruise).collect()
}

fn assert_contiguous(phases: &[Phase], trace: &[Fix]) {
    assert!(!phases.is_empty());
    assert_eq!(phases[0].fixes.first(), trace.first());
    assert_eq!(phases[phases.len() - 1].fixes.last(), trace.last());
    for pair in phases.windows(2) {
        assert_eq!(pair[0].fixes.last(), pair[1].fixes.first(), "phases not contiguous");
        assert_ne!(pair[0].is_cruise, pair[1].is_cruise, "phases do not alternate");
    }
}

#[test]
fn test_circling_is_detected_by_both_methods() {
    let trace = track(&cruise_thermal_cruise(), None);

    for method in [ClassificationMethod::PySoar, ClassificationMethod::XcSoar] {
        let phases = FlightPhases::new(method, &trace, None).all_phases(None).unwrap();
        assert_eq!(pattern(&phases), vec![true, false, true], "{method}");
        assert_contiguous(&phases, &trace);

        let thermal = &phases[1];
        assert!(thermal.duration_s() > 60.0, "{method}");
        assert!(thermal.climb_rate(AltitudeSource::Gps) > 0.0, "{method}");
        assert!(phases[2].climb_rate(AltitudeSource::Pressure) < 0.0, "{method}");
    }
}

#[test]
fn test_jittered_track_stays_contiguous() {
    let mut rng = StdRng::seed_from_u64(7);
    let trace = track(&cruise_thermal_cruise(), Some(&mut rng));

    for method in [ClassificationMethod::PySoar, ClassificationMethod::XcSoar] {
        let phases = method.detector().analyse(&trace);
        assert_contiguous(&phases, &trace);
        assert!(phases.iter().any(Phase::is_thermal), "{method}");
    }
}

#[test]
fn test_small_course_corrections_stay_in_cruise() {
    let mut headings = vec![90.0; 60];
    headings.extend([95.0, 101.0, 105.0]);
    headings.extend(vec![105.0; 60]);
    let trace = track(&headings, None);

    for method in [ClassificationMethod::PySoar, ClassificationMethod::XcSoar] {
        let phases = method.detector().analyse(&trace);
        assert_eq!(pattern(&phases), vec![true], "{method}");
        assert_eq!(phases[0].fixes.len(), trace.len());
    }
}

/// Start and finish lines across the eastbound track, clear of any fix.
fn straight_race() -> Task {
    let start = destination(origin(), 1_515.0, 90.0);
    let finish = destination(origin(), 6_525.0, 90.0);
    let base = TaskBase::new(
        vec![
            Waypoint::line("start", start.lat, start.lon, 1000.0, SectorOrientation::Next),
            Waypoint::line("finish", finish.lat, finish.lon, 1000.0, SectorOrientation::Previous),
        ],
        None,
        0,
        false,
        ScoringRules::default(),
    )
    .unwrap();
    Task::Race(RaceTask::new(base).unwrap())
}

#[test]
fn test_phases_clipped_to_the_leg() {
    let trace = track(&cruise_thermal_cruise(), None);
    let trip = Trip::new(&straight_race(), &trace).unwrap();
    assert_eq!(trip.completed_legs(), 1);

    let phases = FlightPhases::new(ClassificationMethod::PySoar, &trace, Some(trip.clone()));

    let cruises = phases.cruises(Some(LegSelection::Leg(0))).unwrap();
    assert_eq!(cruises.len(), 2);
    assert_eq!(cruises[0].fixes.first(), Some(&trip.fixes[0]));
    assert_eq!(cruises[1].fixes.last(), Some(&trip.fixes[1]));

    let thermals = phases.thermals(Some(LegSelection::Leg(0))).unwrap();
    assert_eq!(thermals, phases.thermals(None).unwrap());

    let whole_trip = phases.all_phases(Some(LegSelection::All)).unwrap();
    assert_eq!(pattern(&whole_trip), vec![true, false, true]);
    assert_eq!(whole_trip[0].fixes.first(), Some(&trip.fixes[0]));

    assert_eq!(
        phases.thermals(Some(LegSelection::Leg(1))),
        Err(ScoringError::LegNotStarted { leg: 1, started_legs: 1 })
    );
}
