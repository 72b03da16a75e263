//! Spherical distance helpers for the "near me" map query.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for 2dsphere distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Length of one degree of latitude, in meters.
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Great-circle distance (haversine).
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_M * c
    }
}

/// Axis-aligned box in degrees. `min_lng > max_lng` never happens; boxes
/// that would wrap the antimeridian span every longitude instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub max_lng: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Smallest box containing every point within `radius_m` of `center`.
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let d_lat = radius_m / METERS_PER_DEGREE;
        let min_lat = (center.lat - d_lat).max(-90.0);
        let max_lat = (center.lat + d_lat).min(90.0);

        // Longitude degrees shrink with latitude; use the widest latitude in range.
        let widest = min_lat.abs().max(max_lat.abs());
        let cos = widest.to_radians().cos();
        let (min_lng, max_lng) = if cos <= f64::EPSILON || max_lat >= 90.0 || min_lat <= -90.0 {
            (-180.0, 180.0)
        } else {
            let d_lng = radius_m / (METERS_PER_DEGREE * cos);
            let (lo, hi) = (center.lng - d_lng, center.lng + d_lng);
            if lo < -180.0 || hi > 180.0 {
                (-180.0, 180.0)
            } else {
                (lo, hi)
            }
        };

        Self { min_lng, max_lng, min_lat, max_lat }
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        (self.min_lng..=self.max_lng).contains(&p.lng) && (self.min_lat..=self.max_lat).contains(&p.lat)
    }
}
