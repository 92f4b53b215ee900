//! Assigned area task: the pilot picks a point in each area and is scored on
//! the distance through the chosen points.
//!
//! The chosen points are recovered by dynamic programming over the fixes
//! recorded inside each area. Areas can hold thousands of fixes, so a first
//! pass runs on a down-sampled candidate set and a second pass searches a
//! small window of the full set around each coarse optimum.

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::Fix;
use crate::spatial::{destination, distance, initial_bearing};
use crate::waypoint::DistanceCorrection;

use super::{EnlMonitor, TaskBase, TaskResult};

#[derive(Debug, Clone, PartialEq)]
pub struct AatTask {
    base: TaskBase,
    t_min: Duration,
    nominal_distances: Vec<f64>,
}

/// Fix indices recorded per waypoint while scanning a trace.
#[derive(Debug)]
struct SectorScan {
    sector_fixes: Vec<Vec<usize>>,
    enl_index: Option<usize>,
    finished: bool,
}

/// Best path through a set of candidate pools.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Optimum {
    /// Trace index of the chosen fix per pool
    pub(crate) indices: Vec<usize>,
    pub(crate) distance: f64,
}

#[derive(Debug)]
pub(crate) struct Optimisation {
    pub(crate) coarse: Optimum,
    pub(crate) refined: Optimum,
}

impl AatTask {
    pub fn new(base: TaskBase, t_min: Duration) -> Self {
        let nominal_distances = base
            .waypoints()
            .windows(2)
            .map(|leg| distance(leg[0].coordinate(), leg[1].coordinate()))
            .collect();
        Self {
            base,
            t_min,
            nominal_distances,
        }
    }

    pub fn base(&self) -> &TaskBase {
        &self.base
    }

    /// Minimum task time.
    pub fn t_min(&self) -> Duration {
        self.t_min
    }

    /// Centre-to-centre leg distances (meters).
    pub fn nominal_distances(&self) -> &[f64] {
        &self.nominal_distances
    }

    pub fn apply_rules(&self, trace: &[Fix]) -> Result<TaskResult> {
        let scan = self.scan_sectors(trace)?;
        if scan.sector_fixes.is_empty() {
            tracing::debug!("assigned area task never started");
            return Ok(TaskResult::did_not_start());
        }

        let outlanded = !scan.finished;
        let optimisation = self.optimise(trace, &scan)?;
        let mut trip_indices = optimisation.refined.indices;
        let outlanding_index = if outlanded { trip_indices.pop() } else { None };

        let fixes: Vec<Fix> = trip_indices.iter().map(|&i| trace[i].clone()).collect();
        let outlanding_fix = outlanding_index.map(|i| trace[i].clone());

        let mut distances: Vec<f64> = fixes
            .windows(2)
            .enumerate()
            .map(|(leg, pair)| self.completed_leg_distance(leg, &pair[0], &pair[1]))
            .collect();
        if let (Some(outlanding), Some(last)) = (&outlanding_fix, fixes.last()) {
            distances.push(self.outlanding_leg_distance(fixes.len() - 1, last, outlanding));
        }

        let refined_start_time = self.base.refined_start_time(trace, trip_indices[0])?;
        let finish_time = self.finish_time(&fixes, outlanded);
        let sector_fixes = scan
            .sector_fixes
            .iter()
            .map(|sector| sector.iter().map(|&i| trace[i].clone()).collect())
            .collect();

        Ok(TaskResult {
            fixes,
            refined_start_time: Some(refined_start_time),
            outlanding_fix,
            distances,
            finish_time,
            sector_fixes,
        })
    }

    /// Time credited at the finish; an early finish is scored at `t_min`.
    fn finish_time(&self, fixes: &[Fix], outlanded: bool) -> Option<DateTime<Utc>> {
        let start = fixes.first()?.time;
        let last = fixes.last()?.time;
        if !outlanded && last - start < self.t_min {
            Some(start + self.t_min)
        } else {
            Some(last)
        }
    }

    /// Record the fixes inside each area, in task order.
    fn scan_sectors(&self, trace: &[Fix]) -> Result<SectorScan> {
        let waypoints = self.base.waypoints();
        let no_legs = self.base.no_legs();
        let rules = &self.base.rules;

        let mut leg: Option<usize> = None;
        let mut sector_fixes: Vec<Vec<usize>> = Vec::new();
        let mut enl = EnlMonitor::default();
        let mut finished = false;

        for index in 1..trace.len() {
            let (previous, fix) = (&trace[index - 1], &trace[index]);

            let Some(current) = leg else {
                if self.base.after_start_opening(fix) && self.base.started(previous, fix)? {
                    tracing::debug!(time = %previous.time, "start detected");
                    sector_fixes.push(vec![index - 1]);
                    leg = Some(0);
                }
                continue;
            };

            if enl.observe(trace, index, rules) && current > 0 {
                break;
            }

            if current == 0 {
                if self.base.started(previous, fix)? {
                    tracing::debug!(time = %previous.time, "restart detected");
                    sector_fixes[0] = vec![index - 1];
                    enl.reset();
                } else if no_legs == 1 {
                    if self.base.finished(previous, fix)? {
                        if enl.registered() {
                            break;
                        }
                        sector_fixes.push(vec![index]);
                        finished = true;
                        break;
                    }
                } else if waypoints[1].inside_sector(previous)? {
                    if enl.registered() {
                        break;
                    }
                    sector_fixes.push(vec![index - 1]);
                    leg = Some(1);
                }
            } else if current < no_legs - 1 {
                if waypoints[current].inside_sector(previous)? {
                    sector_fixes[current].push(index - 1);
                } else if waypoints[current + 1].inside_sector(previous)? {
                    sector_fixes.push(vec![index - 1]);
                    leg = Some(current + 1);
                }
            } else if waypoints[current].inside_sector(previous)? {
                sector_fixes[current].push(index - 1);
            } else if self.base.finished(previous, fix)? {
                sector_fixes.push(vec![index]);
                finished = true;
                break;
            }
        }

        // the pairwise walk never looks at the last fix as `previous`
        if !finished && !enl.registered() {
            if let Some(current) = leg.filter(|&current| current > 0) {
                let last_index = trace.len() - 1;
                let waypoint = &waypoints[current];
                if !waypoint.is_line
                    && waypoint.inside_sector(&trace[last_index])?
                    && sector_fixes[current].last() != Some(&last_index)
                {
                    sector_fixes[current].push(last_index);
                }
            }
        }

        let enl_index = enl.outlanding_index();
        if let Some(enl_index) = enl_index {
            // fixes flown under engine are not eligible
            for sector in &mut sector_fixes {
                sector.retain(|&index| index <= enl_index);
            }
            while sector_fixes.len() > 1 && sector_fixes.last().is_some_and(Vec::is_empty) {
                sector_fixes.pop();
            }
        }

        Ok(SectorScan {
            sector_fixes,
            enl_index,
            finished,
        })
    }

    /// Trace indices after the last area fix that may hold the outlanding point.
    fn outside_sector_indices(&self, trace_len: usize, scan: &SectorScan) -> Vec<usize> {
        let Some(&last_sector_index) = scan.sector_fixes.last().and_then(|sector| sector.last())
        else {
            return Vec::new();
        };
        match scan.enl_index {
            Some(enl_index) if enl_index > last_sector_index => {
                (last_sector_index + 1..=enl_index).collect()
            }
            Some(_) => Vec::new(),
            None => (last_sector_index + 1..trace_len).collect(),
        }
    }

    /// Coarse search on down-sampled areas followed by a windowed refinement.
    #[cfg(test)]
    pub(crate) fn optimise_trace(&self, trace: &[Fix]) -> Result<Option<Optimisation>> {
        let scan = self.scan_sectors(trace)?;
        if scan.sector_fixes.is_empty() {
            return Ok(None);
        }
        self.optimise(trace, &scan).map(Some)
    }

    fn optimise(&self, trace: &[Fix], scan: &SectorScan) -> Result<Optimisation> {
        let rules = &self.base.rules;
        let outlanded = !scan.finished;

        let mut coarse_pools: Vec<Vec<usize>> = scan
            .sector_fixes
            .iter()
            .map(|sector| reduce_fixes(sector, rules.aat_max_sector_fixes))
            .collect();

        // the outlanding leg may end inside the last reached area or anywhere after it
        let full_outlanding_pool = if outlanded {
            let outside = self.outside_sector_indices(trace.len(), scan);
            let mut coarse_pool = coarse_pools.last().cloned().unwrap_or_default();
            coarse_pool.extend(reduce_fixes(&outside, rules.aat_max_sector_fixes));
            coarse_pools.push(coarse_pool);

            let mut full_pool = scan.sector_fixes.last().cloned().unwrap_or_default();
            full_pool.extend(outside);
            Some(full_pool)
        } else {
            None
        };

        let coarse = self.best_path(trace, &coarse_pools, outlanded);

        let window = rules.aat_refinement_fixes;
        let refined_pools: Vec<Vec<usize>> = coarse
            .indices
            .iter()
            .enumerate()
            .map(|(position, &chosen)| {
                let source = match scan.sector_fixes.get(position) {
                    Some(sector) => sector.as_slice(),
                    None => full_outlanding_pool.as_deref().unwrap_or_default(),
                };
                window_around(source, chosen, window)
            })
            .collect();
        let refined = self.best_path(trace, &refined_pools, outlanded);

        tracing::debug!(
            coarse_m = coarse.distance,
            refined_m = refined.distance,
            outlanded,
            "assigned area distance optimised"
        );
        Ok(Optimisation { coarse, refined })
    }

    /// Longest path picking one fix per pool, by dynamic programming.
    ///
    /// When `outlanded`, the last pool holds outlanding candidates and its
    /// leg is credited with the outlanding distance instead.
    fn best_path(&self, trace: &[Fix], pools: &[Vec<usize>], outlanded: bool) -> Optimum {
        let legs = pools.len().saturating_sub(1);
        let completed_legs = if outlanded { legs.saturating_sub(1) } else { legs };

        // per pool entry: best total distance and the position of its predecessor
        let mut table: Vec<Vec<(f64, usize)>> = Vec::with_capacity(pools.len());
        table.push(vec![(0.0, 0); pools.first().map_or(0, Vec::len)]);

        for leg in 0..legs {
            let on_outlanding_leg = leg >= completed_legs;
            let row: Vec<(f64, usize)> = pools[leg + 1]
                .iter()
                .map(|&end| {
                    let mut best = (f64::NEG_INFINITY, 0);
                    for (position, &start) in pools[leg].iter().enumerate() {
                        let (start_fix, end_fix) = (&trace[start], &trace[end]);
                        let leg_distance = if on_outlanding_leg {
                            if start_fix.time > end_fix.time {
                                continue;
                            }
                            self.outlanding_leg_distance(leg, start_fix, end_fix)
                        } else {
                            self.completed_leg_distance(leg, start_fix, end_fix)
                        };
                        let total = table[leg][position].0 + leg_distance;
                        if total > best.0 {
                            best = (total, position);
                        }
                    }
                    best
                })
                .collect();
            table.push(row);
        }

        let mut position = 0;
        let mut best_distance = f64::NEG_INFINITY;
        if let Some(last_row) = table.last() {
            for (candidate, &(total, _)) in last_row.iter().enumerate() {
                if total >= best_distance {
                    best_distance = total;
                    position = candidate;
                }
            }
        }

        let mut indices = Vec::with_capacity(pools.len());
        if let Some(last_pool) = pools.last().filter(|pool| !pool.is_empty()) {
            indices.push(last_pool[position]);
            for leg in (0..legs).rev() {
                position = table[leg + 1][position].1;
                indices.push(pools[leg][position]);
            }
            indices.reverse();
        }

        Optimum {
            indices,
            distance: best_distance.max(0.0),
        }
    }

    /// Distance of a finished leg between two chosen fixes.
    ///
    /// The first and last leg run from the start and to the finish point.
    fn completed_leg_distance(&self, leg: usize, from_fix: &Fix, to_fix: &Fix) -> f64 {
        let start = self.base.start();
        let finish = self.base.finish();
        let last_leg = self.base.no_legs() - 1;

        let from = if leg == 0 { start.coordinate() } else { from_fix.coordinate() };
        let to = if leg == last_leg { finish.coordinate() } else { to_fix.coordinate() };

        let mut leg_distance = distance(from, to);
        if leg == 0 && start.distance_correction == DistanceCorrection::ShortenLegs {
            leg_distance -= start.outer_radius();
        }
        if leg == last_leg && finish.distance_correction == DistanceCorrection::ShortenLegs {
            leg_distance -= finish.outer_radius();
        }
        leg_distance
    }

    /// Progress made from `entry` towards the next area before landing at `candidate`.
    fn outlanding_leg_distance(&self, leg: usize, entry: &Fix, candidate: &Fix) -> f64 {
        let waypoints = self.base.waypoints();
        let from = if leg == 0 { waypoints[0].coordinate() } else { entry.coordinate() };
        let landing = candidate.coordinate();

        let credit = if leg + 1 == self.base.no_legs() {
            let finish = self.base.finish().coordinate();
            distance(from, finish) - distance(finish, landing)
        } else {
            let next = &waypoints[leg + 1];
            let centre = next.coordinate();
            let boundary = destination(centre, next.r_max, initial_bearing(centre, landing));
            distance(from, boundary) - distance(landing, boundary)
        };
        credit.max(0.0)
    }
}

/// Every `len / max_fixes + 1`-th index, so at most `max_fixes` remain.
fn reduce_fixes(indices: &[usize], max_fixes: usize) -> Vec<usize> {
    let stride = indices.len() / max_fixes.max(1) + 1;
    indices.iter().step_by(stride).copied().collect()
}

/// Up to `window` indices either side of `chosen` within `source`.
fn window_around(source: &[usize], chosen: usize, window: usize) -> Vec<usize> {
    match source.iter().position(|&index| index == chosen) {
        Some(position) => {
            let from = position.saturating_sub(window);
            let to = (position + window + 1).min(source.len());
            source[from..to].to_vec()
        }
        None => vec![chosen],
    }
}
