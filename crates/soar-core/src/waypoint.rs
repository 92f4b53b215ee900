//! Task points and their observation zones.
//!
//! A waypoint is either a line (start or finish) or a sector. Sectors cover
//! cylinders (`angle_max == 180`), FAI-style sectors and two-tier "keyhole"
//! zones where an inner disk of `r_min` is combined with an outer sector.
//!
//! The zone opens opposite to `orientation_angle`: a fix is inside when the
//! reflex angle `180 - |bearing difference|` between the orientation and the
//! bearing from the waypoint to the fix is within the zone's half angle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoringError};
use crate::models::Fix;
use crate::spatial::{average_bearing, bearing_difference, distance, initial_bearing, Coordinate};

/// How a waypoint's zone is oriented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorOrientation {
    /// Orientation angle supplied with the task
    Fixed,
    /// Bisector of the incoming and outgoing legs
    Symmetrical,
    /// Along the next leg (start lines)
    Next,
    /// Along the previous leg (finish lines)
    Previous,
    /// Towards the task start
    Start,
}

impl fmt::Display for SectorOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SectorOrientation::Fixed => "fixed",
            SectorOrientation::Symmetrical => "symmetrical",
            SectorOrientation::Next => "next",
            SectorOrientation::Previous => "previous",
            SectorOrientation::Start => "start",
        };
        f.write_str(label)
    }
}

impl FromStr for SectorOrientation {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(SectorOrientation::Fixed),
            "symmetrical" => Ok(SectorOrientation::Symmetrical),
            "next" => Ok(SectorOrientation::Next),
            "previous" => Ok(SectorOrientation::Previous),
            "start" => Ok(SectorOrientation::Start),
            other => Err(ScoringError::UnknownSectorOrientation(other.to_string())),
        }
    }
}

/// Correction applied to nominal leg distances at this waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceCorrection {
    #[default]
    None,
    /// Leg ends at the zone edge instead of the centre
    ShortenLegs,
    /// Turnpoint moved onto the zone boundary nearest the course line
    #[serde(alias = "displace_tp")]
    MoveTp,
}

impl fmt::Display for DistanceCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DistanceCorrection::None => "none",
            DistanceCorrection::ShortenLegs => "shorten_legs",
            DistanceCorrection::MoveTp => "move_tp",
        };
        f.write_str(label)
    }
}

impl FromStr for DistanceCorrection {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" => Ok(DistanceCorrection::None),
            "shorten_legs" => Ok(DistanceCorrection::ShortenLegs),
            "move_tp" | "displace_tp" => Ok(DistanceCorrection::MoveTp),
            other => Err(ScoringError::UnknownDistanceCorrection(other.to_string())),
        }
    }
}

fn full_circle() -> f64 {
    180.0
}

/// Start, turn or finish point of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Inner radius of a keyhole zone (meters)
    #[serde(default)]
    pub r_min: Option<f64>,
    /// Half angle of the inner zone (degrees)
    #[serde(default = "full_circle")]
    pub angle_min: f64,
    /// Outer radius, or half the line length for lines (meters)
    pub r_max: f64,
    /// Half angle of the outer zone (degrees)
    #[serde(default = "full_circle")]
    pub angle_max: f64,
    #[serde(default)]
    pub is_line: bool,
    pub sector_orientation: SectorOrientation,
    #[serde(default)]
    pub distance_correction: DistanceCorrection,
    /// Resolved when the task is built; only supplied up front for fixed sectors.
    #[serde(default)]
    pub orientation_angle: Option<f64>,
}

impl Waypoint {
    /// A start (`Next`) or finish (`Previous`) line of total length `2 * half_length_m`.
    pub fn line(
        name: impl Into<String>,
        lat: f64,
        lon: f64,
        half_length_m: f64,
        orientation: SectorOrientation,
    ) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            r_min: None,
            angle_min: 180.0,
            r_max: half_length_m,
            angle_max: 90.0,
            is_line: true,
            sector_orientation: orientation,
            distance_correction: DistanceCorrection::None,
            orientation_angle: None,
        }
    }

    /// A full cylinder.
    pub fn cylinder(name: impl Into<String>, lat: f64, lon: f64, radius_m: f64) -> Self {
        Self::sector(name, lat, lon, radius_m, 180.0, SectorOrientation::Symmetrical)
    }

    /// A sector with half angle `angle_max` (degrees).
    pub fn sector(
        name: impl Into<String>,
        lat: f64,
        lon: f64,
        r_max: f64,
        angle_max: f64,
        orientation: SectorOrientation,
    ) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            r_min: None,
            angle_min: 180.0,
            r_max,
            angle_max,
            is_line: false,
            sector_orientation: orientation,
            distance_correction: DistanceCorrection::None,
            orientation_angle: None,
        }
    }

    /// Inner disk/sector of `r_min` combined with an outer sector of `r_max`.
    #[allow(clippy::too_many_arguments)]
    pub fn keyhole(
        name: impl Into<String>,
        lat: f64,
        lon: f64,
        r_min: f64,
        angle_min: f64,
        r_max: f64,
        angle_max: f64,
        orientation: SectorOrientation,
    ) -> Self {
        Self {
            r_min: Some(r_min),
            angle_min,
            ..Self::sector(name, lat, lon, r_max, angle_max, orientation)
        }
    }

    pub fn with_distance_correction(mut self, correction: DistanceCorrection) -> Self {
        self.distance_correction = correction;
        self
    }

    /// Fix the orientation angle (degrees). Used with `SectorOrientation::Fixed`.
    pub fn with_orientation_angle(mut self, angle: f64) -> Self {
        self.orientation_angle = Some(angle);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    /// Resolved orientation angle.
    pub fn orientation_angle(&self) -> Result<f64> {
        self.orientation_angle
            .ok_or_else(|| ScoringError::OrientationUnavailable {
                name: self.name.clone(),
                orientation: self.sector_orientation,
            })
    }

    /// Radius removed from a leg by the `shorten_legs` correction.
    pub fn outer_radius(&self) -> f64 {
        self.r_max
    }

    /// Radius the turnpoint is displaced by under `move_tp`.
    pub fn displacement_radius(&self) -> f64 {
        if self.angle_max == 180.0 {
            self.r_max
        } else {
            self.r_min.unwrap_or(0.0)
        }
    }

    /// Reject zone configurations the engine cannot score.
    pub fn validate(&self) -> Result<()> {
        if self.is_line
            && !matches!(
                self.sector_orientation,
                SectorOrientation::Next | SectorOrientation::Previous
            )
        {
            return Err(ScoringError::UnsupportedLineOrientation {
                name: self.name.clone(),
                orientation: self.sector_orientation,
            });
        }
        if self.sector_orientation == SectorOrientation::Fixed && self.orientation_angle.is_none()
        {
            return Err(ScoringError::MissingFixedOrientation(self.name.clone()));
        }
        Ok(())
    }

    /// Resolve the orientation angle from the candidate bearings.
    ///
    /// Each bearing is the final bearing of the great circle arriving at this
    /// waypoint from the start, previous and next waypoint respectively.
    pub fn set_orientation_angle(
        &mut self,
        angle_start: Option<f64>,
        angle_previous: Option<f64>,
        angle_next: Option<f64>,
    ) -> Result<()> {
        let resolved = match self.sector_orientation {
            SectorOrientation::Fixed => {
                if self.orientation_angle.is_none() {
                    return Err(ScoringError::MissingFixedOrientation(self.name.clone()));
                }
                return Ok(());
            }
            SectorOrientation::Symmetrical => match (angle_previous, angle_next) {
                (Some(previous), Some(next)) => Some(average_bearing(previous, next)),
                // a cylinder at the task ends has no bisector, any angle covers it
                _ if self.angle_max == 180.0 => angle_previous.or(angle_next),
                _ => None,
            },
            SectorOrientation::Next => angle_next,
            SectorOrientation::Previous => angle_previous,
            SectorOrientation::Start => angle_start,
        };

        match resolved {
            Some(angle) => {
                self.orientation_angle = Some(angle);
                Ok(())
            }
            None => Err(ScoringError::OrientationUnavailable {
                name: self.name.clone(),
                orientation: self.sector_orientation,
            }),
        }
    }

    /// Whether `fix` lies inside the zone. Fails on lines.
    pub fn inside_sector(&self, fix: &Fix) -> Result<bool> {
        if self.is_line {
            return Err(ScoringError::SectorOperationOnLine(self.name.clone()));
        }

        let center = self.coordinate();
        let position = fix.coordinate();
        let distance_m = distance(center, position);
        let bearing = initial_bearing(center, position);
        let reflex_angle = 180.0 - bearing_difference(self.orientation_angle()?, bearing).abs();

        let inside = match self.r_min {
            Some(r_min) => {
                let inside_outer = r_min < distance_m
                    && distance_m < self.r_max
                    && reflex_angle <= self.angle_max;
                let inside_inner = distance_m < r_min && reflex_angle <= self.angle_min;
                inside_outer || inside_inner
            }
            None => distance_m < self.r_max && reflex_angle <= self.angle_max,
        };
        Ok(inside)
    }

    pub fn outside_sector(&self, fix: &Fix) -> Result<bool> {
        Ok(!self.inside_sector(fix)?)
    }

    /// Whether the segment `fix1 -> fix2` crosses this start or finish line.
    ///
    /// Fixes beyond `r_max` on both ends never cross. Otherwise the crossing is
    /// decided by which side of the perpendicular through the line centre each
    /// fix lies on, which can flag a few crossings just beyond the line ends.
    pub fn crossed_line(&self, fix1: &Fix, fix2: &Fix) -> Result<bool> {
        if !self.is_line {
            return Err(ScoringError::LineOperationOnSector(self.name.clone()));
        }

        let center = self.coordinate();
        let distance1 = distance(fix1.coordinate(), center);
        let distance2 = distance(fix2.coordinate(), center);
        if distance1 > self.r_max && distance2 > self.r_max {
            return Ok(false);
        }

        let orientation = self.orientation_angle()?;
        let deviation1 = bearing_difference(orientation, initial_bearing(center, fix1.coordinate())).abs();
        let deviation2 = bearing_difference(orientation, initial_bearing(center, fix2.coordinate())).abs();

        match self.sector_orientation {
            SectorOrientation::Next => Ok(deviation1 < 90.0 && deviation2 >= 90.0),
            SectorOrientation::Previous => Ok(deviation2 < 90.0 && deviation1 >= 90.0),
            orientation => Err(ScoringError::UnsupportedLineOrientation {
                name: self.name.clone(),
                orientation,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::destination;
    use chrono::{TimeZone, Utc};

    fn fix_at(position: Coordinate) -> Fix {
        Fix::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            position.lat,
            position.lon,
        )
    }

    fn fixed_sector() -> Waypoint {
        Waypoint::sector(
            "test_waypoint",
            51.7509,
            -0.981,
            50_000.0,
            20.0,
            SectorOrientation::Fixed,
        )
        .with_orientation_angle(190.0)
    }

    #[test]
    fn test_inside_sector_true() {
        // within maximum distance and within the angle
        let fix = fix_at(Coordinate::new(52.0, -0.981));
        assert!(fixed_sector().inside_sector(&fix).unwrap());
    }

    #[test]
    fn test_inside_sector_false() {
        // within maximum distance, but not within the angle
        let fix = fix_at(Coordinate::new(51.5, -1.0));
        assert!(!fixed_sector().inside_sector(&fix).unwrap());
        assert!(fixed_sector().outside_sector(&fix).unwrap());
    }

    #[test]
    fn test_fix_exactly_on_radius_is_outside() {
        let mut wp = Waypoint::cylinder("tp", 52.0, 5.0, 500.0).with_orientation_angle(0.0);
        let on_edge = destination(wp.coordinate(), 500.0, 45.0);
        wp.r_max = distance(wp.coordinate(), on_edge);
        let just_inside = destination(wp.coordinate(), 499.0, 45.0);
        assert!(!wp.inside_sector(&fix_at(on_edge)).unwrap());
        assert!(wp.inside_sector(&fix_at(just_inside)).unwrap());
    }

    #[test]
    fn test_boundary_angle_is_deterministic() {
        // sector opens towards bearing 90, half angle 45
        let wp = Waypoint::sector("tp", 52.0, 5.0, 10_000.0, 45.0, SectorOrientation::Fixed)
            .with_orientation_angle(270.0);
        let edge = fix_at(destination(wp.coordinate(), 9_999.0, 45.0));
        let first = wp.inside_sector(&edge).unwrap();
        for _ in 0..10 {
            assert_eq!(wp.inside_sector(&edge).unwrap(), first);
        }
        assert!(wp.inside_sector(&fix_at(destination(wp.coordinate(), 9_999.0, 60.0))).unwrap());
        assert!(!wp.inside_sector(&fix_at(destination(wp.coordinate(), 9_999.0, 30.0))).unwrap());
    }

    #[test]
    fn test_keyhole_inner_disk_and_outer_sector() {
        // DAeC keyhole: 500 m cylinder plus 10 km 90 degree sector opening south
        let wp = Waypoint::keyhole(
            "keyhole",
            52.0,
            5.0,
            500.0,
            180.0,
            10_000.0,
            45.0,
            SectorOrientation::Fixed,
        )
        .with_orientation_angle(0.0);
        let center = wp.coordinate();

        // inner disk accepts any direction
        assert!(wp.inside_sector(&fix_at(destination(center, 300.0, 0.0))).unwrap());
        // outer sector only in the opening direction
        assert!(wp.inside_sector(&fix_at(destination(center, 5_000.0, 180.0))).unwrap());
        assert!(!wp.inside_sector(&fix_at(destination(center, 5_000.0, 0.0))).unwrap());
        assert!(!wp.inside_sector(&fix_at(destination(center, 12_000.0, 180.0))).unwrap());
    }

    #[test]
    fn test_sector_predicate_on_line_fails() {
        let mut line = Waypoint::line("start", 52.0, 5.0, 1000.0, SectorOrientation::Next);
        line.set_orientation_angle(None, None, Some(180.0)).unwrap();
        let fix = fix_at(Coordinate::new(52.0, 5.0));
        assert!(matches!(
            line.inside_sector(&fix),
            Err(ScoringError::SectorOperationOnLine(_))
        ));

        let cylinder = Waypoint::cylinder("tp", 52.0, 5.0, 500.0).with_orientation_angle(0.0);
        assert!(matches!(
            cylinder.crossed_line(&fix, &fix),
            Err(ScoringError::LineOperationOnSector(_))
        ));
    }

    #[test]
    fn test_start_line_crossing_direction() {
        // next waypoint due north, so the line orientation points south
        let mut line = Waypoint::line("start", 52.0, 5.0, 1000.0, SectorOrientation::Next);
        line.set_orientation_angle(None, None, Some(180.0)).unwrap();
        let center = line.coordinate();
        let behind = fix_at(destination(center, 200.0, 180.0));
        let ahead = fix_at(destination(center, 200.0, 0.0));

        assert!(line.crossed_line(&behind, &ahead).unwrap());
        assert!(!line.crossed_line(&ahead, &behind).unwrap());
        assert!(!line.crossed_line(&behind, &behind).unwrap());

        let far_behind = fix_at(destination(center, 5_000.0, 180.0));
        let far_ahead = fix_at(destination(center, 5_000.0, 0.0));
        assert!(!line.crossed_line(&far_behind, &far_ahead).unwrap());
    }

    #[test]
    fn test_finish_line_crossing_direction() {
        // arriving from the south, orientation points north
        let mut line = Waypoint::line("finish", 52.0, 5.0, 1000.0, SectorOrientation::Previous);
        line.set_orientation_angle(None, Some(0.0), None).unwrap();
        let center = line.coordinate();
        let before = fix_at(destination(center, 200.0, 180.0));
        let after = fix_at(destination(center, 200.0, 0.0));

        assert!(line.crossed_line(&before, &after).unwrap());
        assert!(!line.crossed_line(&after, &before).unwrap());
    }

    #[test]
    fn test_line_with_unsupported_orientation() {
        let line = Waypoint::line("odd", 52.0, 5.0, 1000.0, SectorOrientation::Symmetrical)
            .with_orientation_angle(0.0);
        let fix = fix_at(Coordinate::new(52.0, 5.0));
        assert!(matches!(
            line.crossed_line(&fix, &fix),
            Err(ScoringError::UnsupportedLineOrientation { .. })
        ));
        assert!(line.validate().is_err());
    }

    #[test]
    fn test_set_orientation_angle_modes() {
        let mut symmetrical = Waypoint::sector("tp", 52.0, 5.0, 20_000.0, 45.0, SectorOrientation::Symmetrical);
        symmetrical
            .set_orientation_angle(Some(10.0), Some(350.0), Some(30.0))
            .unwrap();
        assert!((symmetrical.orientation_angle().unwrap() - 10.0).abs() < 1e-9);

        let mut start = Waypoint::sector("tp", 52.0, 5.0, 20_000.0, 45.0, SectorOrientation::Start);
        start
            .set_orientation_angle(Some(123.0), Some(1.0), Some(2.0))
            .unwrap();
        assert_eq!(start.orientation_angle, Some(123.0));

        let mut fixed = Waypoint::sector("tp", 52.0, 5.0, 20_000.0, 45.0, SectorOrientation::Fixed);
        assert!(matches!(
            fixed.set_orientation_angle(None, None, None),
            Err(ScoringError::MissingFixedOrientation(_))
        ));

        let mut first_sector = Waypoint::sector("tp", 52.0, 5.0, 20_000.0, 45.0, SectorOrientation::Symmetrical);
        assert!(matches!(
            first_sector.set_orientation_angle(None, None, Some(40.0)),
            Err(ScoringError::OrientationUnavailable { .. })
        ));
    }

    #[test]
    fn test_labels_parse() {
        assert_eq!(
            "displace_tp".parse::<DistanceCorrection>().unwrap(),
            DistanceCorrection::MoveTp
        );
        assert!(matches!(
            "shorten".parse::<DistanceCorrection>(),
            Err(ScoringError::UnknownDistanceCorrection(_))
        ));
        assert_eq!(
            "previous".parse::<SectorOrientation>().unwrap(),
            SectorOrientation::Previous
        );
        assert!(matches!(
            "sideways".parse::<SectorOrientation>(),
            Err(ScoringError::UnknownSectorOrientation(_))
        ));
    }

    #[test]
    fn test_waypoint_from_json() {
        let wp: Waypoint = serde_json::from_str(
            r#"{
                "name": "Gransden",
                "lat": 52.17,
                "lon": -0.11,
                "r_max": 500.0,
                "sector_orientation": "symmetrical",
                "distance_correction": "displace_tp"
            }"#,
        )
        .unwrap();
        assert_eq!(wp.angle_max, 180.0);
        assert!(!wp.is_line);
        assert_eq!(wp.distance_correction, DistanceCorrection::MoveTp);
        assert_eq!(wp.orientation_angle, None);
    }
}
