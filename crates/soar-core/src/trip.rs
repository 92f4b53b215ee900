//! The scored outcome of one flight against one task.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, ScoringError};
use crate::models::Fix;
use crate::task::{Task, TaskResult};

/// A flight's progress through a task.
///
/// Holds the start fix, one fix per reached waypoint and, when the task was
/// not completed, the fix where distance stopped counting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub fixes: Vec<Fix>,
    pub refined_start_time: Option<DateTime<Utc>>,
    pub outlanding_fix: Option<Fix>,
    /// Credited distance per started leg (meters)
    pub distances: Vec<f64>,
    pub finish_time: Option<DateTime<Utc>>,
    /// Fixes recorded inside each area (assigned area tasks only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sector_fixes: Vec<Vec<Fix>>,
}

impl Trip {
    /// Apply `task` to `trace`. An empty trace never started.
    pub fn new(task: &Task, trace: &[Fix]) -> Result<Self> {
        if trace.is_empty() {
            return Ok(Self::from(TaskResult::did_not_start()));
        }
        let trip = Self::from(task.apply_rules(trace)?);
        tracing::debug!(
            reached = trip.fixes.len(),
            outlanded = trip.outlanded(),
            distance_m = trip.total_distance(),
            "trip determined"
        );
        Ok(trip)
    }

    pub fn started(&self) -> bool {
        !self.fixes.is_empty()
    }

    pub fn completed_legs(&self) -> usize {
        self.fixes.len().saturating_sub(1)
    }

    /// Completed legs plus the leg the flight outlanded on.
    pub fn started_legs(&self) -> usize {
        if self.outlanded() {
            self.fixes.len()
        } else {
            self.completed_legs()
        }
    }

    pub fn outlanded(&self) -> bool {
        self.outlanding_fix.is_some()
    }

    /// Leg on which the outlanding happened.
    pub fn outlanding_leg(&self) -> Option<usize> {
        self.outlanded().then(|| self.fixes.len().saturating_sub(1))
    }

    pub fn total_distance(&self) -> f64 {
        self.distances.iter().sum()
    }

    /// Whether `fix` comes no later than the start of `leg`.
    pub fn fix_before_leg(&self, fix: &Fix, leg: usize) -> Result<bool> {
        let leg_start = self.fixes.get(leg).ok_or(ScoringError::LegNotStarted {
            leg,
            started_legs: self.started_legs(),
        })?;
        Ok(fix.time <= leg_start.time)
    }

    /// Whether `fix` comes at or after the end of `leg`.
    ///
    /// Nothing comes after an outlanding leg.
    pub fn fix_after_leg(&self, fix: &Fix, leg: usize) -> Result<bool> {
        if leg < self.completed_legs() {
            Ok(fix.time >= self.fixes[leg + 1].time)
        } else if self.outlanding_leg() == Some(leg) {
            Ok(false)
        } else {
            Err(ScoringError::LegNotStarted {
                leg,
                started_legs: self.started_legs(),
            })
        }
    }

    pub fn fix_on_leg(&self, fix: &Fix, leg: usize) -> Result<bool> {
        Ok(!self.fix_before_leg(fix, leg)? && !self.fix_after_leg(fix, leg)?)
    }

    /// Fix closing `leg`: the next waypoint fix or the outlanding fix.
    pub fn leg_end_fix(&self, leg: usize) -> Result<&Fix> {
        match self.fixes.get(leg + 1) {
            Some(fix) => Ok(fix),
            None if self.outlanding_leg() == Some(leg) => {
                self.outlanding_fix.as_ref().ok_or(ScoringError::NoTrip)
            }
            None => Err(ScoringError::LegNotStarted {
                leg,
                started_legs: self.started_legs(),
            }),
        }
    }
}

impl From<TaskResult> for Trip {
    fn from(result: TaskResult) -> Self {
        Self {
            fixes: result.fixes,
            refined_start_time: result.refined_start_time,
            outlanding_fix: result.outlanding_fix,
            distances: result.distances,
            finish_time: result.finish_time,
            sector_fixes: result.sector_fixes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn fix(s: i64) -> Fix {
        Fix::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(s),
            52.0,
            5.0,
        )
    }

    fn outlanded_trip() -> Trip {
        Trip {
            fixes: vec![fix(0), fix(100)],
            refined_start_time: Some(fix(0).time),
            outlanding_fix: Some(fix(150)),
            distances: vec![10_000.0, 4_000.0],
            finish_time: Some(fix(100).time),
            sector_fixes: Vec::new(),
        }
    }

    #[test]
    fn test_leg_counts() {
        let trip = outlanded_trip();
        assert!(trip.started());
        assert!(trip.outlanded());
        assert_eq!(trip.completed_legs(), 1);
        assert_eq!(trip.started_legs(), 2);
        assert_eq!(trip.outlanding_leg(), Some(1));
        assert_eq!(trip.total_distance(), 14_000.0);

        let empty = Trip::from(TaskResult::did_not_start());
        assert!(!empty.started());
        assert_eq!(empty.completed_legs(), 0);
        assert_eq!(empty.started_legs(), 0);
        assert_eq!(empty.outlanding_leg(), None);
    }

    #[test]
    fn test_fix_position_relative_to_legs() {
        let trip = outlanded_trip();
        assert!(trip.fix_before_leg(&fix(50), 1).unwrap());
        assert!(!trip.fix_before_leg(&fix(120), 1).unwrap());
        assert!(trip.fix_after_leg(&fix(100), 0).unwrap());
        assert!(!trip.fix_after_leg(&fix(500), 1).unwrap());
        assert!(trip.fix_on_leg(&fix(50), 0).unwrap());
        assert!(trip.fix_on_leg(&fix(120), 1).unwrap());
    }

    #[test]
    fn test_unreached_leg_is_reported() {
        let trip = outlanded_trip();
        assert_eq!(
            trip.fix_after_leg(&fix(50), 2),
            Err(ScoringError::LegNotStarted {
                leg: 2,
                started_legs: 2
            })
        );
        assert!(trip.fix_before_leg(&fix(50), 2).is_err());
        assert!(trip.leg_end_fix(2).is_err());
        assert_eq!(trip.leg_end_fix(1).unwrap(), &fix(150));
    }
}
