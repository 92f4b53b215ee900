//! Detector integrating signed bearing change over consistent turns.
//!
//! Cruise becomes thermal once the glider has turned more than
//! `cruise_threshold_bearing_total` degrees without reversing direction. A
//! turn entered sharply pushes the gentle lead-in back into the cruise.
//! Thermal becomes cruise once the candidate-cruise fixes cover
//! `thermal_threshold_distance` at a low average turn rate.

use serde::{Deserialize, Serialize};

use crate::models::{seconds_between, Fix};
use crate::spatial::{bearing_change, distance};

use super::{Phase, PhaseIndices, ThermalDetector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PySoarConfig {
    /// Turn rate counted as still turning the same way (deg/s)
    pub minimum_bearing_change_rate: f64,
    /// Turn rate marking a sharp thermal entry (deg/s)
    pub cruise_threshold_bearing_rate: f64,
    /// Accumulated turn that confirms a thermal (deg)
    pub cruise_threshold_bearing_total: f64,
    /// Straight distance that confirms leaving a thermal (m)
    pub thermal_threshold_distance: f64,
    /// Average turn rate below which a straight segment counts as cruise (deg/s)
    pub thermal_threshold_bearing_rate_avg: f64,
    /// Turn rate that keeps the glider in the thermal (deg/s)
    pub thermal_threshold_bearing_rate: f64,
}

impl Default for PySoarConfig {
    fn default() -> Self {
        Self {
            minimum_bearing_change_rate: 1e-2,
            cruise_threshold_bearing_rate: 4.0,
            cruise_threshold_bearing_total: 225.0,
            thermal_threshold_distance: 1000.0,
            thermal_threshold_bearing_rate_avg: 2.0,
            thermal_threshold_bearing_rate: 4.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PySoarDetector {
    config: PySoarConfig,
}

impl PySoarDetector {
    pub fn new(config: PySoarConfig) -> Self {
        Self { config }
    }
}

impl ThermalDetector for PySoarDetector {
    fn analyse(&self, trace: &[Fix]) -> Vec<Phase> {
        if trace.is_empty() {
            return Vec::new();
        }
        let config = &self.config;

        let mut phases = PhaseIndices::starting_in_cruise(trace.len());
        let mut cruise = true;
        let mut possible_thermal: Vec<usize> = Vec::new();
        let mut possible_cruise: Vec<usize> = Vec::new();
        let mut sharp_entry_found = false;
        let mut turning_left = true;
        let mut total_bearing_change = 0.0;

        for index in 2..trace.len() {
            let (fix_minus2, fix_minus1, fix) = (&trace[index - 2], &trace[index - 1], &trace[index]);

            let change = bearing_change(
                fix_minus2.coordinate(),
                fix_minus1.coordinate(),
                fix.coordinate(),
            );
            let delta_t =
                0.5 * seconds_between(fix_minus1, fix) + 0.5 * seconds_between(fix_minus2, fix);
            let rate = if delta_t > 0.0 { change / delta_t } else { 0.0 };

            if cruise {
                let continuing_left = turning_left && rate < config.minimum_bearing_change_rate;
                let continuing_right = !turning_left && rate > -config.minimum_bearing_change_rate;

                if continuing_left || continuing_right {
                    total_bearing_change += change;
                    if !possible_thermal.is_empty()
                        && !sharp_entry_found
                        && rate.abs() > config.cruise_threshold_bearing_rate
                    {
                        sharp_entry_found = true;
                        phases.extend_current(possible_thermal.drain(..));
                    }
                    possible_thermal.push(index);
                } else {
                    total_bearing_change = change;
                    sharp_entry_found = false;
                    phases.extend_current(possible_thermal.drain(..));
                    phases.extend_current([index]);
                    turning_left = rate < 0.0;
                }

                if total_bearing_change.abs() > config.cruise_threshold_bearing_total
                    && !possible_thermal.is_empty()
                {
                    tracing::trace!(time = %trace[possible_thermal[0]].time, "thermal entered");
                    cruise = false;
                    phases.switch(false, std::mem::take(&mut possible_thermal));
                    sharp_entry_found = false;
                    total_bearing_change = 0.0;
                }
            } else if rate.abs() > config.thermal_threshold_bearing_rate {
                phases.extend_current(possible_cruise.drain(..));
                phases.extend_current([index]);
            } else {
                if possible_cruise.is_empty() {
                    total_bearing_change = change;
                } else {
                    total_bearing_change += change;
                }
                possible_cruise.push(index);

                let first = &trace[possible_cruise[0]];
                let elapsed_s = seconds_between(first, fix);
                let cruise_distance = distance(first.coordinate(), fix.coordinate());
                let average_rate = if elapsed_s == 0.0 {
                    0.0
                } else {
                    total_bearing_change / elapsed_s
                };

                if cruise_distance > config.thermal_threshold_distance
                    && average_rate.abs() < config.thermal_threshold_bearing_rate_avg
                {
                    tracing::trace!(time = %first.time, "cruise entered");
                    cruise = true;
                    phases.switch(true, std::mem::take(&mut possible_cruise));
                    total_bearing_change = 0.0;
                }
            }
        }

        // unconfirmed candidates belong to the phase in progress
        if cruise {
            phases.extend_current(possible_thermal);
        } else {
            phases.extend_current(possible_cruise);
        }

        phases.into_phases(trace)
    }
}
