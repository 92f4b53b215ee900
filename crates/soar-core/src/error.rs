//! Error type for task configuration and trip queries.

use crate::waypoint::SectorOrientation;

/// Errors raised by the scoring core.
///
/// Outlandings, ENL outlandings and flights that never start are trip states,
/// not errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("unknown distance correction: {0}")]
    UnknownDistanceCorrection(String),
    #[error("unknown sector orientation: {0}")]
    UnknownSectorOrientation(String),
    #[error("classification method {0} not supported")]
    UnknownClassificationMethod(String),
    #[error("calling a line operation on sector waypoint {0}")]
    LineOperationOnSector(String),
    #[error("calling a sector operation on line waypoint {0}")]
    SectorOperationOnLine(String),
    #[error("line waypoint {name} has orientation {orientation}, only start (next) and finish (previous) lines are supported")]
    UnsupportedLineOrientation {
        name: String,
        orientation: SectorOrientation,
    },
    #[error("orientation angle should be set for fixed sector {0}")]
    MissingFixedOrientation(String),
    #[error("waypoint {name} cannot use {orientation} orientation at this position in the task")]
    OrientationUnavailable {
        name: String,
        orientation: SectorOrientation,
    },
    #[error("a task needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("multistart is not supported")]
    MultistartUnsupported,

    #[error("no trace present")]
    EmptyTrace,
    #[error("no trip specified")]
    NoTrip,
    #[error("task not present")]
    NoTask,
    #[error("leg {leg} not started, trip only contains {started_legs} legs")]
    LegNotStarted { leg: usize, started_legs: usize },
}

impl ScoringError {
    /// True for errors caused by the task or analysis configuration.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            ScoringError::EmptyTrace | ScoringError::NoTrip | ScoringError::LegNotStarted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScoringError>;
