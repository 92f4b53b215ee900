//! Detector thresholding a low-pass filtered turn rate, as flight computers do.
//!
//! Entering and staying in a turn use the same `min_turn_rate`. The only
//! hysteresis between circling and cruising comes from the confirmation
//! timers: a turn must last `cruise_thermal_switch_s` before it counts as a
//! thermal, and straight flight must last `thermal_cruise_switch_s` before
//! it ends one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{seconds_between, Fix};
use crate::spatial::bearing_change;

use super::{Phase, PhaseIndices, ThermalDetector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XcSoarConfig {
    /// Weight of the newest turn rate in the filter
    pub lowpass_factor: f64,
    /// Instantaneous turn rates are clamped to +/- this value (deg/s)
    pub max_turn_rate: f64,
    /// Smoothed turn rate above which the glider is circling (deg/s)
    pub min_turn_rate: f64,
    /// Circling time before a thermal is confirmed (s)
    pub cruise_thermal_switch_s: f64,
    /// Straight time before a cruise is confirmed (s)
    pub thermal_cruise_switch_s: f64,
}

impl Default for XcSoarConfig {
    fn default() -> Self {
        Self {
            lowpass_factor: 0.3,
            max_turn_rate: 50.0,
            min_turn_rate: 4.0,
            cruise_thermal_switch_s: 15.0,
            thermal_cruise_switch_s: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlyingState {
    Cruise,
    PossibleThermal,
    Thermal,
    PossibleCruise,
}

impl fmt::Display for FlyingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlyingState::Cruise => write!(f, "cruise"),
            FlyingState::PossibleThermal => write!(f, "possible thermal"),
            FlyingState::Thermal => write!(f, "thermal"),
            FlyingState::PossibleCruise => write!(f, "possible cruise"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct XcSoarDetector {
    config: XcSoarConfig,
}

impl XcSoarDetector {
    pub fn new(config: XcSoarConfig) -> Self {
        Self { config }
    }

    fn smoothed_turn_rate(&self, previous: f64, fixes: [&Fix; 3]) -> f64 {
        let [fix_minus2, fix_minus1, fix] = fixes;
        let change = bearing_change(
            fix_minus2.coordinate(),
            fix_minus1.coordinate(),
            fix.coordinate(),
        );
        let delta_t = 0.5 * seconds_between(fix_minus1, fix) + 0.5 * seconds_between(fix_minus2, fix);
        let turn_rate = (change / delta_t).clamp(-self.config.max_turn_rate, self.config.max_turn_rate);
        (1.0 - self.config.lowpass_factor) * previous + self.config.lowpass_factor * turn_rate
    }
}

impl ThermalDetector for XcSoarDetector {
    fn analyse(&self, trace: &[Fix]) -> Vec<Phase> {
        if trace.is_empty() {
            return Vec::new();
        }
        let config = &self.config;

        let mut phases = PhaseIndices::starting_in_cruise(trace.len());
        let mut state = FlyingState::Cruise;
        let mut possible: Vec<usize> = Vec::new();
        let mut turn_rate = 0.0;

        for index in 2..trace.len() {
            let fixes = [&trace[index - 2], &trace[index - 1], &trace[index]];
            // out-of-order or repeated timestamps carry no turn rate
            if !(fixes[0].time < fixes[1].time && fixes[1].time < fixes[2].time) {
                match state {
                    FlyingState::PossibleThermal | FlyingState::PossibleCruise => possible.push(index),
                    FlyingState::Cruise | FlyingState::Thermal => phases.extend_current([index]),
                }
                continue;
            }

            turn_rate = self.smoothed_turn_rate(turn_rate, fixes);
            let circling = turn_rate.abs() > config.min_turn_rate;

            let next_state = match (state, circling) {
                (FlyingState::Cruise, false) | (FlyingState::Thermal, true) => {
                    phases.extend_current([index]);
                    state
                }
                (FlyingState::Cruise, true) => {
                    possible = vec![index];
                    FlyingState::PossibleThermal
                }
                (FlyingState::Thermal, false) => {
                    possible = vec![index];
                    FlyingState::PossibleCruise
                }
                (FlyingState::PossibleThermal, false) => {
                    phases.extend_current(possible.drain(..).chain([index]));
                    FlyingState::Cruise
                }
                (FlyingState::PossibleCruise, true) => {
                    phases.extend_current(possible.drain(..).chain([index]));
                    FlyingState::Thermal
                }
                (FlyingState::PossibleThermal, true) | (FlyingState::PossibleCruise, false) => {
                    possible.push(index);
                    let (target, switch_s) = if state == FlyingState::PossibleThermal {
                        (FlyingState::Thermal, config.cruise_thermal_switch_s)
                    } else {
                        (FlyingState::Cruise, config.thermal_cruise_switch_s)
                    };
                    let held_s = seconds_between(&trace[possible[0]], fixes[2]);
                    if held_s > switch_s {
                        phases.switch(target == FlyingState::Cruise, std::mem::take(&mut possible));
                        target
                    } else {
                        state
                    }
                }
            };

            if next_state != state {
                tracing::trace!(time = %fixes[2].time, from = %state, to = %next_state, "flying state changed");
                state = next_state;
            }
        }

        phases.extend_current(possible);
        phases.into_phases(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{destination, Coordinate};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_filter_clamps_and_smooths() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let origin = Coordinate::new(52.0, 5.0);
        let a = destination(origin, 100.0, 0.0);
        // reverse course in one second: 180 deg/s clamps to 50
        let fixes = [
            Fix::new(t0, origin.lat, origin.lon),
            Fix::new(t0 + Duration::seconds(1), a.lat, a.lon),
            Fix::new(t0 + Duration::seconds(2), origin.lat, origin.lon),
        ];
        let detector = XcSoarDetector::default();
        let smoothed = detector.smoothed_turn_rate(0.0, [&fixes[0], &fixes[1], &fixes[2]]);
        assert!((smoothed.abs() - 0.3 * 50.0).abs() < 1e-6);
    }

    /// One fix per second at 30 m/s; each segment is (seconds, turn rate in deg/s).
    fn track(segments: &[(usize, f64)]) -> Vec<Fix> {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut position = Coordinate::new(52.0, 5.0);
        let mut heading: f64 = 0.0;
        let mut trace = vec![Fix::new(t0, position.lat, position.lon)];
        for &(seconds, rate) in segments {
            for _ in 0..seconds {
                heading = (heading + rate).rem_euclid(360.0);
                position = destination(position, 30.0, heading);
                let time = t0 + Duration::seconds(trace.len() as i64);
                trace.push(Fix::new(time, position.lat, position.lon));
            }
        }
        trace
    }

    fn thermal_count(trace: &[Fix]) -> usize {
        XcSoarDetector::default()
            .analyse(trace)
            .iter()
            .filter(|phase| !phase.is_cruise)
            .count()
    }

    #[test]
    fn test_cruise_timer_bridges_short_straights() {
        // a few seconds below the threshold do not end the thermal
        let short_break = track(&[(60, 0.0), (120, 12.0), (6, 0.0), (120, 12.0), (120, 0.0)]);
        assert_eq!(thermal_count(&short_break), 1);

        let long_break = track(&[(60, 0.0), (120, 12.0), (40, 0.0), (120, 12.0), (120, 0.0)]);
        assert_eq!(thermal_count(&long_break), 2);
    }

    #[test]
    fn test_repeated_timestamps_are_kept() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let origin = Coordinate::new(52.0, 5.0);
        let mut trace: Vec<Fix> = (0..20)
            .map(|s| {
                let p = destination(origin, s as f64 * 30.0, 90.0);
                Fix::new(t0 + Duration::seconds(s), p.lat, p.lon)
            })
            .collect();
        trace[10].time = trace[9].time;

        let phases = XcSoarDetector::default().analyse(&trace);
        let covered: usize = phases.iter().map(|phase| phase.fixes.len()).sum::<usize>()
            - (phases.len() - 1);
        assert_eq!(covered, trace.len());
    }
}
