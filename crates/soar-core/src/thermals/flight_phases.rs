//! Classified phases of one flight, optionally clipped to the legs of its trip.

use crate::error::{Result, ScoringError};
use crate::models::Fix;
use crate::trip::Trip;

use super::{ClassificationMethod, Phase, ThermalDetector};

/// Which part of the trip a phase query is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegSelection {
    Leg(usize),
    /// From the start to the last fix of the trip
    All,
}

#[derive(Debug, Clone)]
pub struct FlightPhases {
    phases: Vec<Phase>,
    trip: Option<Trip>,
}

impl FlightPhases {
    pub fn new(method: ClassificationMethod, trace: &[Fix], trip: Option<Trip>) -> Self {
        Self::with_detector(method.detector().as_ref(), trace, trip)
    }

    pub fn with_detector(detector: &dyn ThermalDetector, trace: &[Fix], trip: Option<Trip>) -> Self {
        let phases = detector.analyse(trace);
        tracing::debug!(
            phases = phases.len(),
            thermals = phases.iter().filter(|phase| phase.is_thermal()).count(),
            "trace classified"
        );
        Self { phases, trip }
    }

    pub fn trip(&self) -> Option<&Trip> {
        self.trip.as_ref()
    }

    pub fn thermals(&self, leg: Option<LegSelection>) -> Result<Vec<Phase>> {
        self.select(leg, Phase::is_thermal)
    }

    pub fn cruises(&self, leg: Option<LegSelection>) -> Result<Vec<Phase>> {
        self.select(leg, |phase| phase.is_cruise)
    }

    pub fn all_phases(&self, leg: Option<LegSelection>) -> Result<Vec<Phase>> {
        self.select(leg, |_| true)
    }

    fn select(&self, leg: Option<LegSelection>, keep: impl Fn(&Phase) -> bool) -> Result<Vec<Phase>> {
        let Some(selection) = leg else {
            return Ok(self.phases.iter().filter(|phase| keep(phase)).cloned().collect());
        };
        self.check_leg(selection)?;

        let mut selected = Vec::new();
        for phase in self.phases.iter().filter(|phase| keep(phase)) {
            let clipped = match selection {
                LegSelection::Leg(leg) => self.phase_within_leg(phase, leg)?,
                LegSelection::All => self.phase_within_trip(phase)?,
            };
            selected.extend(clipped);
        }
        Ok(selected)
    }

    fn check_leg(&self, selection: LegSelection) -> Result<&Trip> {
        let trip = self.trip.as_ref().ok_or(ScoringError::NoTrip)?;
        let started_legs = trip.started_legs();
        let leg = match selection {
            LegSelection::Leg(leg) => leg,
            LegSelection::All => 0,
        };
        if leg >= started_legs {
            return Err(ScoringError::LegNotStarted { leg, started_legs });
        }
        Ok(trip)
    }

    /// Part of `phase` flown on `leg`, or `None` when it lies outside the leg.
    pub fn phase_within_leg(&self, phase: &Phase, leg: usize) -> Result<Option<Phase>> {
        let trip = self.check_leg(LegSelection::Leg(leg))?;
        let (Some(first), Some(last)) = (phase.fixes.first(), phase.fixes.last()) else {
            return Ok(None);
        };

        let start_in_leg = trip.fix_on_leg(first, leg)?;
        let end_in_leg = trip.fix_on_leg(last, leg)?;
        let (use_trip_start, use_trip_end) = match (start_in_leg, end_in_leg) {
            (true, true) => (false, false),
            (true, false) => (false, true),
            (false, true) => (true, false),
            (false, false) => {
                if trip.fix_before_leg(first, leg)? && trip.fix_after_leg(last, leg)? {
                    (true, true)
                } else {
                    return Ok(None);
                }
            }
        };

        let start = if use_trip_start { &trip.fixes[leg] } else { first };
        let end = if use_trip_end { trip.leg_end_fix(leg)? } else { last };
        Ok(clip(phase, start, end))
    }

    /// Part of `phase` flown between the start and the end of the trip.
    pub fn phase_within_trip(&self, phase: &Phase) -> Result<Option<Phase>> {
        let trip = self.check_leg(LegSelection::All)?;
        let (Some(first), Some(last)) = (phase.fixes.first(), phase.fixes.last()) else {
            return Ok(None);
        };
        let first_leg = 0;
        let last_leg = trip.started_legs() - 1;

        let start_before_trip = trip.fix_before_leg(first, first_leg)?;
        let end_before_trip = trip.fix_before_leg(last, first_leg)?;
        let end_after_trip = trip.fix_after_leg(last, last_leg)?;

        let (use_trip_start, use_trip_end) = if start_before_trip {
            if end_before_trip {
                return Ok(None);
            }
            (true, end_after_trip)
        } else if !end_after_trip {
            (false, false)
        } else if trip.fix_after_leg(first, last_leg)? {
            return Ok(None);
        } else {
            (false, true)
        };

        let start = if use_trip_start { &trip.fixes[first_leg] } else { first };
        let end = if use_trip_end { trip.leg_end_fix(last_leg)? } else { last };
        Ok(clip(phase, start, end))
    }
}

/// Sub-phase from `start` to `end` inclusive, located by timestamp.
fn clip(phase: &Phase, start: &Fix, end: &Fix) -> Option<Phase> {
    let from = phase.fixes.iter().position(|fix| fix.time == start.time)?;
    let to = phase.fixes.iter().rposition(|fix| fix.time == end.time)?;
    if from > to {
        return None;
    }
    Some(Phase {
        is_cruise: phase.is_cruise,
        fixes: phase.fixes[from..=to].to_vec(),
    })
}
