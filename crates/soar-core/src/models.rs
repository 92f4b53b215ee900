//! GPS fix model and trace helpers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::spatial::{distance, Coordinate};

/// One GPS sample from a flight recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub gps_alt: Option<f64>,
    #[serde(default)]
    pub pressure_alt: Option<f64>,
    /// Engine noise level
    #[serde(default, alias = "ENL")]
    pub enl: Option<f64>,
}

impl Fix {
    /// Create a fix with position and time only.
    pub fn new(time: DateTime<Utc>, lat: f64, lon: f64) -> Self {
        Self {
            time,
            lat,
            lon,
            gps_alt: None,
            pressure_alt: None,
            enl: None,
        }
    }

    /// Set GPS and pressure altitude.
    pub fn with_altitude(mut self, gps_alt: f64, pressure_alt: f64) -> Self {
        self.gps_alt = Some(gps_alt);
        self.pressure_alt = Some(pressure_alt);
        self
    }

    /// Set the engine noise level reading.
    pub fn with_enl(mut self, enl: f64) -> Self {
        self.enl = Some(enl);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Which altimeter to read from a fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AltitudeSource {
    #[default]
    Gps,
    Pressure,
}

impl AltitudeSource {
    fn read(self, fix: &Fix) -> Option<f64> {
        match self {
            AltitudeSource::Gps => fix.gps_alt,
            AltitudeSource::Pressure => fix.pressure_alt,
        }
    }
}

/// Seconds from `a` to `b` (negative when `b` is earlier).
pub fn seconds_between(a: &Fix, b: &Fix) -> f64 {
    (b.time - a.time).num_milliseconds() as f64 / 1000.0
}

/// Linearly interpolate fixes between `a` and `b` every `interval_s` seconds.
///
/// Both endpoints are included. Only time, latitude and longitude are
/// interpolated; the result carries no altitude or ENL.
pub fn interpolate_fixes(a: &Fix, b: &Fix, interval_s: i64) -> Vec<Fix> {
    let total_s = (b.time - a.time).num_seconds();
    let interval_s = interval_s.max(1);
    if total_s <= 0 {
        return vec![Fix::new(a.time, a.lat, a.lon), Fix::new(b.time, b.lat, b.lon)];
    }

    let mut offsets: Vec<i64> = (0..total_s).step_by(interval_s as usize).collect();
    offsets.push(total_s);

    offsets
        .into_iter()
        .map(|offset| {
            let fraction = offset as f64 / total_s as f64;
            Fix::new(
                a.time + Duration::seconds(offset),
                a.lat + fraction * (b.lat - a.lat),
                a.lon + fraction * (b.lon - a.lon),
            )
        })
        .collect()
}

/// Summed climb and summed descent over consecutive fixes, both non-negative.
///
/// Pairs missing the requested altitude are skipped.
pub fn altitude_gain_and_loss(fixes: &[Fix], source: AltitudeSource) -> (f64, f64) {
    fixes
        .windows(2)
        .filter_map(|pair| Some(source.read(&pair[1])? - source.read(&pair[0])?))
        .fold((0.0, 0.0), |(gain, loss), delta_h| {
            if delta_h >= 0.0 {
                (gain + delta_h, loss)
            } else {
                (gain, loss - delta_h)
            }
        })
}

/// Sum of the inter-fix distances.
pub fn total_distance_travelled(fixes: &[Fix]) -> f64 {
    fixes
        .windows(2)
        .map(|pair| distance(pair[0].coordinate(), pair[1].coordinate()))
        .sum()
}
