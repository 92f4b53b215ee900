//! Scoring rules and thresholds shared by the task engines.

use serde::{Deserialize, Serialize};

/// Configuration for the trip engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    /// ENL reading above which the engine is considered running
    pub enl_value_threshold: f64,
    /// Seconds of continuous high ENL before the flight counts as motor-assisted
    pub enl_time_threshold_s: f64,
    /// Cap on candidate fixes per AAT sector in the coarse optimisation
    pub aat_max_sector_fixes: usize,
    /// Fixes before and after each coarse optimum searched in the refinement pass
    pub aat_refinement_fixes: usize,
    /// Step used when refining the start instant between two fixes (seconds)
    pub start_interpolation_interval_s: i64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            enl_value_threshold: 500.0,
            enl_time_threshold_s: 30.0,
            aat_max_sector_fixes: 300,
            aat_refinement_fixes: 10,
            start_interpolation_interval_s: 1,
        }
    }
}
