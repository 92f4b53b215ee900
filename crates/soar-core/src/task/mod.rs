//! Competition tasks and the rules that turn a trace into scored fixes.
//!
//! Both task types share the start/finish predicates, the start-opening gate
//! and ENL monitoring kept in [`TaskBase`]; they differ in how legs are
//! completed and how distance is credited.

pub mod aat;
pub mod race;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoringError};
use crate::models::{interpolate_fixes, seconds_between, Fix};
use crate::rules::ScoringRules;
use crate::spatial::final_bearing;
use crate::waypoint::Waypoint;

pub use aat::AatTask;
pub use race::RaceTask;

/// Serialized form of a task, as supplied by a task-definition source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub waypoints: Vec<Waypoint>,
    /// Earliest valid start (UTC)
    #[serde(default)]
    pub start_opening: Option<DateTime<Utc>>,
    /// Grace period before the start opening (seconds)
    #[serde(default)]
    pub start_time_buffer_s: i64,
    #[serde(default)]
    pub multistart: bool,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default)]
    pub rules: ScoringRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    Race,
    Aat {
        /// Minimum task time (seconds)
        t_min_s: i64,
    },
}

/// Waypoints and start settings shared by all task types.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBase {
    waypoints: Vec<Waypoint>,
    pub start_opening: Option<DateTime<Utc>>,
    pub start_time_buffer_s: i64,
    pub multistart: bool,
    pub rules: ScoringRules,
}

impl TaskBase {
    /// Build the shared task state, resolving every waypoint's orientation angle.
    pub fn new(
        mut waypoints: Vec<Waypoint>,
        start_opening: Option<DateTime<Utc>>,
        start_time_buffer_s: i64,
        multistart: bool,
        rules: ScoringRules,
    ) -> Result<Self> {
        if waypoints.len() < 2 {
            return Err(ScoringError::TooFewWaypoints(waypoints.len()));
        }
        for waypoint in &waypoints {
            waypoint.validate()?;
        }
        let last = waypoints.len() - 1;
        if let Some(line) = waypoints[1..last].iter().find(|waypoint| waypoint.is_line) {
            return Err(ScoringError::SectorOperationOnLine(line.name.clone()));
        }
        set_orientation_angles(&mut waypoints)?;

        Ok(Self {
            waypoints,
            start_opening,
            start_time_buffer_s,
            multistart,
            rules,
        })
    }

    /// Waypoints are read-only once the task is built; distances depend on them.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn start(&self) -> &Waypoint {
        &self.waypoints[0]
    }

    pub fn finish(&self) -> &Waypoint {
        &self.waypoints[self.waypoints.len() - 1]
    }

    pub fn no_tps(&self) -> usize {
        self.waypoints.len() - 2
    }

    pub fn no_legs(&self) -> usize {
        self.waypoints.len() - 1
    }

    /// Whether moving from `fix1` to `fix2` leaves the start zone.
    pub fn started(&self, fix1: &Fix, fix2: &Fix) -> Result<bool> {
        let start = self.start();
        if start.is_line {
            start.crossed_line(fix1, fix2)
        } else {
            Ok(start.inside_sector(fix1)? && start.outside_sector(fix2)?)
        }
    }

    /// Whether moving from `fix1` to `fix2` enters the finish zone.
    pub fn finished(&self, fix1: &Fix, fix2: &Fix) -> Result<bool> {
        let finish = self.finish();
        if finish.is_line {
            finish.crossed_line(fix1, fix2)
        } else {
            Ok(finish.outside_sector(fix1)? && finish.inside_sector(fix2)?)
        }
    }

    pub(crate) fn after_start_opening(&self, fix: &Fix) -> bool {
        match self.start_opening {
            Some(opening) => fix.time + Duration::seconds(self.start_time_buffer_s) > opening,
            None => true,
        }
    }

    /// Sub-fix start instant between `trace[start_index]` and the following fix.
    ///
    /// Falls back to the recorded start fix when the interpolated track does
    /// not reproduce the crossing.
    pub fn refined_start_time(&self, trace: &[Fix], start_index: usize) -> Result<DateTime<Utc>> {
        let start_fix = &trace[start_index];
        let Some(next_fix) = trace.get(start_index + 1) else {
            return Ok(start_fix.time);
        };

        let interpolated = interpolate_fixes(
            start_fix,
            next_fix,
            self.rules.start_interpolation_interval_s,
        );
        for pair in interpolated.windows(2) {
            if self.started(&pair[0], &pair[1])? {
                return Ok(pair[0].time);
            }
        }

        tracing::debug!(
            time = %start_fix.time,
            "start crossing not reproduced by interpolation, using recorded fix"
        );
        Ok(start_fix.time)
    }
}

/// Set the orientation angle of every waypoint from its neighbours.
fn set_orientation_angles(waypoints: &mut [Waypoint]) -> Result<()> {
    let positions: Vec<_> = waypoints.iter().map(Waypoint::coordinate).collect();
    let last = positions.len() - 1;

    for (index, waypoint) in waypoints.iter_mut().enumerate() {
        let here = positions[index];
        if index == 0 {
            let angle_next = final_bearing(positions[1], here);
            waypoint.set_orientation_angle(None, None, Some(angle_next))?;
        } else if index == last {
            let angle_previous = final_bearing(positions[last - 1], here);
            waypoint.set_orientation_angle(None, Some(angle_previous), None)?;
        } else {
            waypoint.set_orientation_angle(
                Some(final_bearing(positions[0], here)),
                Some(final_bearing(positions[index - 1], here)),
                Some(final_bearing(positions[index + 1], here)),
            )?;
        }
    }
    Ok(())
}

/// Tracks sustained engine noise while a trace is scanned.
#[derive(Debug, Default)]
pub(crate) struct EnlMonitor {
    /// Quiet fix preceding the current noisy run
    run_start: Option<usize>,
    first_noisy: Option<usize>,
    registered: bool,
}

impl EnlMonitor {
    /// Feed `trace[index]`; returns whether engine use has been registered.
    ///
    /// A run is timed from the fix preceding its first noisy fix.
    pub(crate) fn observe(&mut self, trace: &[Fix], index: usize, rules: &ScoringRules) -> bool {
        if self.registered {
            return true;
        }

        let fix = &trace[index];
        if fix.enl.is_some_and(|enl| enl > rules.enl_value_threshold) {
            self.first_noisy.get_or_insert(index);
            let start = *self.run_start.get_or_insert(index.saturating_sub(1));
            if seconds_between(&trace[start], fix) >= rules.enl_time_threshold_s {
                self.registered = true;
                tracing::debug!(time = %fix.time, "engine use registered");
            }
        } else {
            self.run_start = None;
            self.first_noisy = None;
        }
        self.registered
    }

    pub(crate) fn registered(&self) -> bool {
        self.registered
    }

    /// First noisy fix of the registered engine run.
    pub(crate) fn outlanding_index(&self) -> Option<usize> {
        if self.registered {
            self.first_noisy
        } else {
            None
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Raw outcome of applying a task's rules to a trace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskResult {
    pub fixes: Vec<Fix>,
    pub refined_start_time: Option<DateTime<Utc>>,
    pub outlanding_fix: Option<Fix>,
    pub distances: Vec<f64>,
    pub finish_time: Option<DateTime<Utc>>,
    pub sector_fixes: Vec<Vec<Fix>>,
}

impl TaskResult {
    /// Result for a trace that never starts the task.
    pub fn did_not_start() -> Self {
        Self::default()
    }
}

/// A scoring task.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Race(RaceTask),
    Aat(AatTask),
}

impl Task {
    pub fn from_definition(definition: TaskDefinition) -> Result<Self> {
        let base = TaskBase::new(
            definition.waypoints,
            definition.start_opening,
            definition.start_time_buffer_s,
            definition.multistart,
            definition.rules,
        )?;
        match definition.kind {
            TaskKind::Race => Ok(Task::Race(RaceTask::new(base)?)),
            TaskKind::Aat { t_min_s } => {
                Ok(Task::Aat(AatTask::new(base, Duration::seconds(t_min_s))))
            }
        }
    }

    pub fn base(&self) -> &TaskBase {
        match self {
            Task::Race(task) => task.base(),
            Task::Aat(task) => task.base(),
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        self.base().waypoints()
    }

    pub fn no_legs(&self) -> usize {
        self.base().no_legs()
    }

    pub fn multistart(&self) -> bool {
        self.base().multistart
    }

    /// Match `trace` against the task.
    ///
    /// A trace that never starts yields an empty result, not an error.
    pub fn apply_rules(&self, trace: &[Fix]) -> Result<TaskResult> {
        match self {
            Task::Race(task) => task.apply_rules(trace),
            Task::Aat(task) => task.apply_rules(trace),
        }
    }
}
