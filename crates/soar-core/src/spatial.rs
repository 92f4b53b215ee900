//! Spherical geodesy used by the zone predicates and the trip engine.
//!
//! All bearings are in degrees, 0 = north, clockwise. Distances are meters.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two coordinates.
///
/// Identical coordinates give exactly 0.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    haversine_distance(a.lat, a.lon, b.lat, b.lon)
}

/// Bearing of the great circle from `a` to `b`, taken at `a`.
pub fn initial_bearing(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_bearing(x.atan2(y).to_degrees())
}

/// Bearing of the great circle from `a` to `b`, taken at `b` (direction of travel on arrival).
pub fn final_bearing(a: Coordinate, b: Coordinate) -> f64 {
    normalize_bearing(initial_bearing(b, a) + 180.0)
}

/// Smallest signed turn from `bearing1` to `bearing2`, in (-180, 180].
pub fn bearing_difference(bearing1: f64, bearing2: f64) -> f64 {
    let difference = bearing2 - bearing1;
    if difference > -180.0 && difference <= 180.0 {
        difference
    } else if difference <= -180.0 {
        difference + 360.0
    } else {
        difference - 360.0
    }
}

/// Heading change over three consecutive points.
///
/// Returns 0 when two of the points coincide.
pub fn bearing_change(p0: Coordinate, p1: Coordinate, p2: Coordinate) -> f64 {
    if p0 == p1 || p1 == p2 {
        return 0.0;
    }
    bearing_difference(initial_bearing(p0, p1), initial_bearing(p1, p2))
}

/// Vector mean of two bearings, safe across north.
pub fn average_bearing(bearing1: f64, bearing2: f64) -> f64 {
    let (sin_a, cos_a) = bearing1.to_radians().sin_cos();
    let (sin_b, cos_b) = bearing2.to_radians().sin_cos();
    normalize_bearing((sin_a + sin_b).atan2(cos_a + cos_b).to_degrees())
}

/// Project a point `distance_m` along `bearing_deg` from `origin`.
pub fn destination(origin: Coordinate, distance_m: f64, bearing_deg: f64) -> Coordinate {
    if distance_m.abs() <= f64::EPSILON {
        return origin;
    }

    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let bearing_rad = bearing_deg.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    Coordinate::new(lat2.to_degrees(), lon2.to_degrees())
}

fn normalize_bearing(bearing: f64) -> f64 {
    let normalized = bearing.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}
