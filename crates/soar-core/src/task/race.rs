//! Race task: turnpoints must be reached in order, distance is fixed per leg.

use crate::error::Result;
use crate::models::Fix;
use crate::spatial::{bearing_difference, distance, final_bearing};
use crate::waypoint::{DistanceCorrection, Waypoint};

use super::{EnlMonitor, TaskBase, TaskResult};

#[derive(Debug, Clone, PartialEq)]
pub struct RaceTask {
    base: TaskBase,
    distances: Vec<f64>,
}

/// Which end of a leg is displaced under `move_tp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovedPoint {
    Begin,
    End,
    /// End moved after the begin point was already moved
    BothEnd,
}

/// Fix indices reached while scanning a trace.
struct LegScan {
    fix_indices: Vec<usize>,
    enl_index: Option<usize>,
}

impl RaceTask {
    pub fn new(base: TaskBase) -> Result<Self> {
        let distances = base
            .waypoints()
            .windows(2)
            .map(|leg| leg_distance(&leg[0], &leg[1]))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            legs = distances.len(),
            total_m = distances.iter().sum::<f64>(),
            "race task distances computed"
        );
        Ok(Self { base, distances })
    }

    pub fn base(&self) -> &TaskBase {
        &self.base
    }

    /// Nominal distance per leg (meters), after distance corrections.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn total_distance(&self) -> f64 {
        self.distances.iter().sum()
    }

    pub fn apply_rules(&self, trace: &[Fix]) -> Result<TaskResult> {
        let scan = self.scan_trace(trace)?;
        let Some(&start_index) = scan.fix_indices.first() else {
            tracing::debug!("race task never started");
            return Ok(TaskResult::did_not_start());
        };

        let outlanding_index = if scan.fix_indices.len() < self.base.waypoints().len() {
            Some(self.outlanding_index(trace, &scan))
        } else {
            None
        };

        let fixes: Vec<Fix> = scan.fix_indices.iter().map(|&i| trace[i].clone()).collect();
        let outlanding_fix = outlanding_index.map(|i| trace[i].clone());

        let mut distances: Vec<f64> = self.distances[..fixes.len() - 1].to_vec();
        if let Some(fix) = &outlanding_fix {
            distances.push(self.outlanding_distance(fixes.len() - 1, fix));
        }

        let refined_start_time = self.base.refined_start_time(trace, start_index)?;
        let finish_time = fixes.last().map(|fix| fix.time);

        Ok(TaskResult {
            fixes,
            refined_start_time: Some(refined_start_time),
            outlanding_fix,
            distances,
            finish_time,
            sector_fixes: Vec::new(),
        })
    }

    /// Walk the trace once, recording start and turnpoint fixes.
    fn scan_trace(&self, trace: &[Fix]) -> Result<LegScan> {
        let no_legs = self.base.no_legs();
        let mut leg: Option<usize> = None;
        let mut fix_indices = Vec::new();
        let mut enl = EnlMonitor::default();

        for index in 1..trace.len() {
            let (previous, fix) = (&trace[index - 1], &trace[index]);

            let Some(current) = leg else {
                if self.base.after_start_opening(fix) && self.base.started(previous, fix)? {
                    tracing::debug!(time = %previous.time, "start detected");
                    fix_indices.push(index - 1);
                    leg = Some(0);
                }
                continue;
            };

            enl.observe(trace, index, &self.base.rules);

            if current == 0 && self.base.started(previous, fix)? {
                tracing::debug!(time = %previous.time, "restart detected");
                fix_indices[0] = index - 1;
                enl.reset();
            }

            if !enl.registered() && self.finished_leg(current, previous, fix)? {
                fix_indices.push(index);
                leg = Some(current + 1);
                if current + 1 == no_legs {
                    break;
                }
            }
        }

        Ok(LegScan {
            fix_indices,
            enl_index: enl.outlanding_index(),
        })
    }

    fn finished_leg(&self, leg: usize, fix1: &Fix, fix2: &Fix) -> Result<bool> {
        let next = &self.base.waypoints()[leg + 1];
        if next.is_line {
            next.crossed_line(fix1, fix2)
        } else {
            Ok(next.outside_sector(fix1)? && next.inside_sector(fix2)?)
        }
    }

    /// Fix on the unfinished leg that earns the most distance.
    fn outlanding_index(&self, trace: &[Fix], scan: &LegScan) -> usize {
        let outlanding_leg = scan.fix_indices.len() - 1;
        let from = scan.fix_indices[outlanding_leg];
        let to = scan.enl_index.unwrap_or(trace.len() - 1).max(from);

        let mut best = (from, 0.0);
        for index in from..=to {
            let credit = self.outlanding_distance(outlanding_leg, &trace[index]);
            if credit > best.1 {
                best = (index, credit);
            }
        }

        if best.1 > 0.0 {
            best.0
        } else {
            // no progress on the leg: score where the flight ended
            to
        }
    }

    /// Distance credited for `fix` on `leg`, never negative.
    pub fn outlanding_distance(&self, leg: usize, fix: &Fix) -> f64 {
        let waypoints = self.base.waypoints();
        let previous = waypoints[leg].coordinate();
        let next = waypoints[leg + 1].coordinate();
        (distance(previous, next) - distance(next, fix.coordinate())).max(0.0)
    }
}

/// Nominal length of the leg `begin -> end` after both endpoint corrections.
fn leg_distance(begin: &Waypoint, end: &Waypoint) -> Result<f64> {
    use DistanceCorrection as Correction;

    let direct = distance(begin.coordinate(), end.coordinate());
    let corrected = match (begin.distance_correction, end.distance_correction) {
        (Correction::None, Correction::None) => direct,
        (Correction::None, Correction::ShortenLegs) => direct - end.outer_radius(),
        (Correction::None, Correction::MoveTp) => {
            moved_turnpoint_distance(direct, begin, end, MovedPoint::End)?
        }
        (Correction::ShortenLegs, Correction::None) => direct - begin.outer_radius(),
        (Correction::ShortenLegs, Correction::ShortenLegs) => {
            direct - begin.outer_radius() - end.outer_radius()
        }
        (Correction::ShortenLegs, Correction::MoveTp) => {
            moved_turnpoint_distance(direct, begin, end, MovedPoint::End)? - begin.outer_radius()
        }
        (Correction::MoveTp, Correction::None) => {
            moved_turnpoint_distance(direct, begin, end, MovedPoint::Begin)?
        }
        (Correction::MoveTp, Correction::ShortenLegs) => {
            moved_turnpoint_distance(direct, begin, end, MovedPoint::Begin)? - end.outer_radius()
        }
        (Correction::MoveTp, Correction::MoveTp) => {
            let moved_begin = moved_turnpoint_distance(direct, begin, end, MovedPoint::Begin)?;
            moved_turnpoint_distance(moved_begin, begin, end, MovedPoint::BothEnd)?
        }
    };
    Ok(corrected)
}

/// Law of cosines for a leg whose endpoint sits on its zone boundary.
fn moved_turnpoint_distance(
    leg_distance: f64,
    begin: &Waypoint,
    end: &Waypoint,
    moved_point: MovedPoint,
) -> Result<f64> {
    let (moved, other, angle_reduction) = match moved_point {
        MovedPoint::Begin => (begin, end, 0.0),
        MovedPoint::End => (end, begin, 0.0),
        MovedPoint::BothEnd => {
            let original = distance(begin.coordinate(), end.coordinate());
            let displaced = begin.displacement_radius();
            let denominator = -2.0 * leg_distance * original;
            let reduction = if denominator != 0.0 {
                let cosine = (displaced.powi(2) - leg_distance.powi(2) - original.powi(2)) / denominator;
                cosine.clamp(-1.0, 1.0).acos().to_degrees().abs()
            } else {
                0.0
            };
            (end, begin, reduction)
        }
    };

    let displacement = moved.displacement_radius();
    let approach = final_bearing(other.coordinate(), moved.coordinate());
    let angle = bearing_difference(moved.orientation_angle()?, approach).abs() - angle_reduction;

    Ok((leg_distance.powi(2) + displacement.powi(2)
        - 2.0 * leg_distance * displacement * angle.to_radians().cos())
    .sqrt())
}
