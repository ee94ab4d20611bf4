//! Geometry kernel: distances, areas and point-in-polygon tests
//!
//! All functions take coordinates in decimal degrees and treat longitude as `x` and
//! latitude as `y`. Altitude is ignored.

use crate::Coordinate;
use geo::{BoundingRect, LineString, Rect};

/// Earth radius used by the great-circle distance, in kilometers
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Great-circle distance between two positions in kilometers (haversine formula)
///
/// # Arguments
/// * `lon1`, `lat1` - First position in decimal degrees
/// * `lon2`, `lat2` - Second position in decimal degrees
///
/// NaN inputs propagate to a NaN result.
#[inline]
pub fn great_circle_distance_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let delta_lat = lat2 - lat1;
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1.0 for antipodal points
    let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Total great-circle length of a path in kilometers
///
/// Returns 0 for paths with fewer than two points.
pub fn path_length(coords: &[Coordinate]) -> f64 {
    coords
        .windows(2)
        .map(|w| great_circle_distance_km(w[0].lon, w[0].lat, w[1].lon, w[1].lat))
        .sum()
}

/// Planar area of a ring using the shoelace formula, in square degrees
///
/// The ring is implicitly closed. This is not a geodesic area and is not meaningful
/// across the antimeridian or near the poles.
pub fn polygon_area(coords: &[Coordinate]) -> f64 {
    let n = coords.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for i in 0..n {
        let p = coords[i];
        let q = coords[(i + 1) % n];
        twice_area += p.lon * q.lat - q.lon * p.lat;
    }

    (twice_area / 2.0).abs()
}

/// Even-odd ray casting test of `(x, y)` against a ring
///
/// Edges follow a half-open rule: an edge is crossed when exactly one of its
/// endpoints lies strictly above `y` and the crossing is strictly right of `x`.
/// Horizontal edges never count, so a point on the bottom or left boundary is
/// inside and a point on the top or right boundary is outside.
pub fn is_point_inside(polygon: &[Coordinate], x: f64, y: f64) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[j];
        let b = polygon[i];
        if (a.lat > y) != (b.lat > y) {
            // Non-horizontal by construction of the condition above
            let x_cross = a.lon + (y - a.lat) * (b.lon - a.lon) / (b.lat - a.lat);
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Bounding rectangle of a coordinate list, `None` when empty
pub fn bounding_rect(coords: &[Coordinate]) -> Option<Rect<f64>> {
    let line: LineString<f64> = coords.iter().map(|&c| geo::Coord::from(c)).collect();
    line.bounding_rect()
}
