//! Competitors and the competition day that scores them against one task.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoringError};
use crate::models::Fix;
use crate::task::Task;
use crate::thermals::{ClassificationMethod, FlightPhases};
use crate::trip::Trip;

/// One pilot's flight on a competition day.
#[derive(Debug, Clone)]
pub struct Competitor {
    pub competition_id: String,
    pub pilot: Option<String>,
    pub airplane: Option<String>,
    pub ranking: Option<u32>,
    pub trace: Vec<Fix>,
    trip: Option<Trip>,
    phases: Option<FlightPhases>,
}

/// Identity fields of a competitor, as listed in the day's results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetitorInfo {
    pub competition_id: String,
    #[serde(default)]
    pub pilot: Option<String>,
    #[serde(default)]
    pub airplane: Option<String>,
    #[serde(default)]
    pub ranking: Option<u32>,
}

impl Competitor {
    pub fn new(info: CompetitorInfo, trace: Vec<Fix>) -> Self {
        Self {
            competition_id: info.competition_id,
            pilot: info.pilot,
            airplane: info.airplane,
            ranking: info.ranking,
            trace,
            trip: None,
            phases: None,
        }
    }

    /// Set by [`Competitor::analyse`].
    pub fn trip(&self) -> Option<&Trip> {
        self.trip.as_ref()
    }

    /// Set by [`Competitor::analyse`] when the flight started the task.
    pub fn phases(&self) -> Option<&FlightPhases> {
        self.phases.as_ref()
    }

    /// Score the trace against `task` and classify its phases.
    pub fn analyse(&mut self, task: &Task, method: ClassificationMethod) -> Result<()> {
        if self.trace.is_empty() {
            return Err(ScoringError::EmptyTrace);
        }

        let trip = Trip::new(task, &self.trace)?;
        self.phases = trip
            .started()
            .then(|| FlightPhases::new(method, &self.trace, Some(trip.clone())));
        self.trip = Some(trip);
        Ok(())
    }
}

/// All competitors of one class flying one task on one day.
#[derive(Debug, Clone)]
pub struct CompetitionDay {
    pub name: String,
    pub date: NaiveDate,
    pub plane_class: String,
    pub competitors: Vec<Competitor>,
    pub task: Option<Task>,
}

impl CompetitionDay {
    pub fn new(
        name: impl Into<String>,
        date: NaiveDate,
        plane_class: impl Into<String>,
        competitors: Vec<Competitor>,
        task: Option<Task>,
    ) -> Self {
        Self {
            name: name.into(),
            date,
            plane_class: plane_class.into(),
            competitors,
            task,
        }
    }

    /// Analyse every competitor in turn.
    ///
    /// `progress` is called with `(analysed, total)` after each competitor.
    /// With `skip_failed` a competitor failing on its own data is logged and
    /// its id returned instead of aborting the day. Configuration errors
    /// always abort.
    pub fn analyse_flights(
        &mut self,
        method: ClassificationMethod,
        mut progress: Option<&mut dyn FnMut(usize, usize)>,
        skip_failed: bool,
    ) -> Result<Vec<String>> {
        let task = self.task.as_ref().ok_or(ScoringError::NoTask)?;
        if task.multistart() {
            return Err(ScoringError::MultistartUnsupported);
        }

        let total = self.competitors.len();
        let mut failed = Vec::new();
        for (analysed, competitor) in self.competitors.iter_mut().enumerate() {
            match competitor.analyse(task, method) {
                Ok(()) => {}
                Err(e) if skip_failed && !e.is_configuration() => {
                    tracing::warn!(
                        competition_id = %competitor.competition_id,
                        error = %e,
                        "skipping failed analysis"
                    );
                    failed.push(competitor.competition_id.clone());
                }
                Err(e) => return Err(e),
            }

            if let Some(report) = progress.as_mut() {
                report(analysed + 1, total);
            }
        }

        tracing::info!(
            day = %self.name,
            class = %self.plane_class,
            analysed = total - failed.len(),
            skipped = failed.len(),
            "competition day analysed"
        );
        Ok(failed)
    }
}
