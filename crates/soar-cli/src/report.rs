//! JSON reports printed by the binaries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use soar_core::{
    AltitudeSource, CompetitionDay, Competitor, FlightPhases, Fix, LegSelection, Phase, Trip,
};

/// Totals over a set of phases.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub count: usize,
    pub duration_s: f64,
    pub distance_m: f64,
    pub altitude_gain_m: f64,
    pub altitude_loss_m: f64,
    /// Net altitude change over total duration (m/s)
    pub average_vertical_speed_ms: Option<f64>,
}

impl PhaseSummary {
    pub fn from_phases(phases: &[Phase]) -> Self {
        let mut summary = Self {
            count: phases.len(),
            ..Self::default()
        };
        for phase in phases {
            let (gain, loss) = phase.altitude_gain_and_loss(AltitudeSource::Gps);
            summary.duration_s += phase.duration_s();
            summary.distance_m += phase.distance_travelled();
            summary.altitude_gain_m += gain;
            summary.altitude_loss_m += loss;
        }
        if summary.duration_s > 0.0 {
            summary.average_vertical_speed_ms =
                Some((summary.altitude_gain_m - summary.altitude_loss_m) / summary.duration_s);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegReport {
    pub leg: usize,
    pub distance_m: f64,
    pub completed: bool,
    /// Absent when phases were not classified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermals: Option<PhaseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cruises: Option<PhaseSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightReport {
    pub competition_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pilot: Option<String>,
    pub started: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub total_distance_m: f64,
    pub outlanded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlanding_fix: Option<Fix>,
    pub legs: Vec<LegReport>,
}

impl FlightReport {
    pub fn new(
        competition_id: impl Into<String>,
        trip: &Trip,
        phases: Option<&FlightPhases>,
    ) -> soar_core::Result<Self> {
        let completed_legs = trip.completed_legs();
        let mut legs = Vec::with_capacity(trip.started_legs());
        for (leg, &distance_m) in trip.distances.iter().enumerate().take(trip.started_legs()) {
            let (thermals, cruises) = match phases {
                Some(phases) => {
                    let selection = Some(LegSelection::Leg(leg));
                    (
                        Some(PhaseSummary::from_phases(&phases.thermals(selection)?)),
                        Some(PhaseSummary::from_phases(&phases.cruises(selection)?)),
                    )
                }
                None => (None, None),
            };
            legs.push(LegReport {
                leg,
                distance_m,
                completed: leg < completed_legs,
                thermals,
                cruises,
            });
        }

        Ok(Self {
            competition_id: competition_id.into(),
            pilot: None,
            started: trip.started(),
            start_time: trip.refined_start_time,
            finish_time: trip.finish_time,
            total_distance_m: trip.total_distance(),
            outlanded: trip.outlanded(),
            outlanding_fix: trip.outlanding_fix.clone(),
            legs,
        })
    }

    /// Report for an analysed competitor, `None` before analysis.
    pub fn from_competitor(competitor: &Competitor) -> Option<soar_core::Result<Self>> {
        let trip = competitor.trip()?;
        Some(
            Self::new(competitor.competition_id.clone(), trip, competitor.phases()).map(|report| {
                Self {
                    pilot: competitor.pilot.clone(),
                    ..report
                }
            }),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReport {
    pub name: String,
    pub date: NaiveDate,
    pub plane_class: String,
    pub flights: Vec<FlightReport>,
    /// Competitors whose analysis failed
    pub skipped: Vec<String>,
}

impl DayReport {
    pub fn new(day: &CompetitionDay, skipped: Vec<String>) -> soar_core::Result<Self> {
        let flights = day
            .competitors
            .iter()
            .filter_map(FlightReport::from_competitor)
            .collect::<soar_core::Result<Vec<_>>>()?;
        Ok(Self {
            name: day.name.clone(),
            date: day.date,
            plane_class: day.plane_class.clone(),
            flights,
            skipped,
        })
    }
}
