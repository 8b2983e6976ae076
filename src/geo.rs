//! Coordinate handling and great-circle distance.

use geo::HaversineDistance;
use geo::Point;

/// Fixed-point degrees, 1e-6 resolution. Matches the on-disk node record.
pub const COORDINATE_PRECISION: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedCoordinate {
    pub lat: i32,
    pub lon: i32,
}

impl FixedCoordinate {
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat: (lat * COORDINATE_PRECISION).round() as i32,
            lon: (lon * COORDINATE_PRECISION).round() as i32,
        }
    }

    pub fn lat_degrees(&self) -> f64 {
        f64::from(self.lat) / COORDINATE_PRECISION
    }

    pub fn lon_degrees(&self) -> f64 {
        f64::from(self.lon) / COORDINATE_PRECISION
    }
}

/// Great-circle distance in meters.
pub fn haversine_distance(from: FixedCoordinate, to: FixedCoordinate) -> f64 {
    let p1 = Point::new(from.lon_degrees(), from.lat_degrees());
    let p2 = Point::new(to.lon_degrees(), to.lat_degrees());
    p1.haversine_distance(&p2)
}
