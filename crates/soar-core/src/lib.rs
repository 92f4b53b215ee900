pub mod competition;
pub mod error;
pub mod models;
pub mod rules;
pub mod spatial;
pub mod task;
pub mod thermals;
pub mod trip;
pub mod waypoint;

pub use competition::{CompetitionDay, Competitor, CompetitorInfo};
pub use error::{Result, ScoringError};
pub use models::{
    altitude_gain_and_loss, interpolate_fixes, seconds_between, total_distance_travelled,
    AltitudeSource, Fix,
};
pub use rules::ScoringRules;
pub use spatial::{distance, Coordinate};
pub use task::{AatTask, RaceTask, Task, TaskBase, TaskDefinition, TaskKind, TaskResult};
pub use thermals::{
    ClassificationMethod, FlightPhases, LegSelection, Phase, PySoarConfig, PySoarDetector,
    ThermalDetector, XcSoarConfig, XcSoarDetector,
};
pub use trip::Trip;
pub use waypoint::{DistanceCorrection, SectorOrientation, Waypoint};
