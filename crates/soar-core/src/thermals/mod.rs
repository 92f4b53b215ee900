//! Thermal and cruise classification of a trace.

pub mod flight_phases;
pub mod pysoar;
pub mod xcsoar;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoringError};
use crate::models::{altitude_gain_and_loss, seconds_between, total_distance_travelled, AltitudeSource, Fix};

pub use flight_phases::{FlightPhases, LegSelection};
pub use pysoar::{PySoarConfig, PySoarDetector};
pub use xcsoar::{XcSoarConfig, XcSoarDetector};

/// A contiguous run of fixes flown either circling or cruising.
///
/// Adjacent phases share their boundary fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    pub is_cruise: bool,
    pub fixes: Vec<Fix>,
}

impl Phase {
    pub fn is_thermal(&self) -> bool {
        !self.is_cruise
    }

    pub fn duration_s(&self) -> f64 {
        match (self.fixes.first(), self.fixes.last()) {
            (Some(first), Some(last)) => seconds_between(first, last),
            _ => 0.0,
        }
    }

    pub fn altitude_gain_and_loss(&self, source: AltitudeSource) -> (f64, f64) {
        altitude_gain_and_loss(&self.fixes, source)
    }

    /// Net altitude change per second, zero for an instantaneous phase.
    pub fn climb_rate(&self, source: AltitudeSource) -> f64 {
        let duration_s = self.duration_s();
        if duration_s <= 0.0 {
            return 0.0;
        }
        let (gain, loss) = self.altitude_gain_and_loss(source);
        (gain - loss) / duration_s
    }

    pub fn distance_travelled(&self) -> f64 {
        total_distance_travelled(&self.fixes)
    }
}

/// Splits a trace into alternating cruise and thermal phases.
///
/// Implementations start in cruise and return phases covering the whole
/// trace, where each phase begins with the last fix of the one before.
pub trait ThermalDetector {
    fn analyse(&self, trace: &[Fix]) -> Vec<Phase>;
}

/// Which detector classifies the trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    #[default]
    PySoar,
    XcSoar,
}

impl ClassificationMethod {
    pub fn detector(self) -> Box<dyn ThermalDetector> {
        match self {
            ClassificationMethod::PySoar => Box::new(PySoarDetector::default()),
            ClassificationMethod::XcSoar => Box::new(XcSoarDetector::default()),
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationMethod::PySoar => write!(f, "pysoar"),
            ClassificationMethod::XcSoar => write!(f, "xcsoar"),
        }
    }
}

impl FromStr for ClassificationMethod {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pysoar" => Ok(ClassificationMethod::PySoar),
            "xcsoar" => Ok(ClassificationMethod::XcSoar),
            _ => Err(ScoringError::UnknownClassificationMethod(s.to_string())),
        }
    }
}

/// Phases as trace indices while a detector runs.
#[derive(Debug, Default)]
pub(crate) struct PhaseIndices {
    phases: Vec<(bool, Vec<usize>)>,
}

impl PhaseIndices {
    /// Opening cruise phase holding the first two fixes.
    pub(crate) fn starting_in_cruise(trace_len: usize) -> Self {
        Self {
            phases: vec![(true, (0..trace_len.min(2)).collect())],
        }
    }

    pub(crate) fn extend_current(&mut self, indices: impl IntoIterator<Item = usize>) {
        if let Some((_, current)) = self.phases.last_mut() {
            current.extend(indices);
        }
    }

    /// Close the current phase at `indices[0]` and open a new one with `indices`.
    pub(crate) fn switch(&mut self, is_cruise: bool, indices: Vec<usize>) {
        if let Some(&first) = indices.first() {
            self.extend_current([first]);
        }
        self.phases.push((is_cruise, indices));
    }

    pub(crate) fn into_phases(self, trace: &[Fix]) -> Vec<Phase> {
        self.phases
            .into_iter()
            .map(|(is_cruise, indices)| Phase {
                is_cruise,
                fixes: indices.into_iter().map(|i| trace[i].clone()).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_method_parsing() {
        assert_eq!("pysoar".parse::<ClassificationMethod>().unwrap(), ClassificationMethod::PySoar);
        assert_eq!("XCSoar".parse::<ClassificationMethod>().unwrap(), ClassificationMethod::XcSoar);
        assert_eq!(
            "seeyou".parse::<ClassificationMethod>(),
            Err(ScoringError::UnknownClassificationMethod("seeyou".to_string()))
        );
        assert_eq!(ClassificationMethod::XcSoar.to_string(), "xcsoar");
    }

    #[test]
    fn test_phase_metrics() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let phase = Phase {
            is_cruise: false,
            fixes: (0..5)
                .map(|s| {
                    Fix::new(t0 + Duration::seconds(s * 10), 52.0, 5.0)
                        .with_altitude(1000.0 + s as f64 * 20.0, 990.0)
                })
                .collect(),
        };
        assert!(phase.is_thermal());
        assert_eq!(phase.duration_s(), 40.0);
        assert_eq!(phase.altitude_gain_and_loss(AltitudeSource::Gps), (80.0, 0.0));
        assert_eq!(phase.climb_rate(AltitudeSource::Gps), 2.0);
        assert_eq!(phase.climb_rate(AltitudeSource::Pressure), 0.0);
        assert_eq!(phase.distance_travelled(), 0.0);
    }
}
