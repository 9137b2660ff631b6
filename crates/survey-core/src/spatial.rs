//! Spherical-earth geometry kernel.
//!
//! Every distance, bearing and projection in the planner goes through this
//! module so that path spacing is computed with a single earth model.

use crate::models::GeoPoint;

/// Mean earth radius used by every formula in this module.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (Haversine formula).
///
/// Coincident points return exactly 0.
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let distance = 2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt());
    if distance.is_finite() {
        distance
    } else {
        0.0
    }
}

/// Great-circle distance in meters.
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance(a, b)
}

/// Initial bearing from `a` to `b` in degrees, in [0, 360).
///
/// Coincident points return 0.
pub fn bearing(a: &GeoPoint, b: &GeoPoint) -> f64 {
    if a == b {
        return 0.0;
    }
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
    if x.abs() < f64::EPSILON && y.abs() < f64::EPSILON {
        return 0.0;
    }
    normalize_bearing(x.atan2(y).to_degrees())
}

/// Wrap any angle into [0, 360).
pub fn normalize_bearing(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid of a tiny negative value rounds up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Smallest absolute difference between two bearings, in [0, 180].
pub fn bearing_delta(a_deg: f64, b_deg: f64) -> f64 {
    let diff = normalize_bearing(a_deg - b_deg);
    diff.min(360.0 - diff)
}

/// Project `origin` by `distance_m` along `bearing_deg` (0 = north, clockwise).
pub fn destination(origin: &GeoPoint, distance_m: f64, bearing_deg: f64) -> GeoPoint {
    if distance_m.abs() <= f64::EPSILON || !distance_m.is_finite() {
        return *origin;
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

    GeoPoint::new(lon2.to_degrees(), lat2.to_degrees())
}

/// Great-circle midpoint of two points.
pub fn midpoint(a: &GeoPoint, b: &GeoPoint) -> GeoPoint {
    if a == b {
        return *a;
    }
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let lambda1 = a.lon.to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let bx = phi2.cos() * dlambda.cos();
    let by = phi2.cos() * dlambda.sin();
    let phi_m = (phi1.sin() + phi2.sin()).atan2(((phi1.cos() + bx).powi(2) + by * by).sqrt());
    let lambda_m = lambda1 + by.atan2(phi1.cos() + bx);

    GeoPoint::new(lambda_m.to_degrees(), phi_m.to_degrees())
}

/// Local east/north plane centered on an origin point.
///
/// Points map through distance and bearing from the origin (azimuthal
/// equidistant), so planar offsets agree with [`haversine_distance`] and
/// [`destination`] exactly along rays from the origin.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: GeoPoint,
}

impl LocalFrame {
    pub fn new(origin: GeoPoint) -> Self {
        Self { origin }
    }

    /// (east_m, north_m) of `point` relative to the origin.
    pub fn to_local(&self, point: &GeoPoint) -> (f64, f64) {
        let d = haversine_distance(&self.origin, point);
        if d <= f64::EPSILON {
            return (0.0, 0.0);
        }
        let b = bearing(&self.origin, point).to_radians();
        (d * b.sin(), d * b.cos())
    }

    pub fn to_geo(&self, east_m: f64, north_m: f64) -> GeoPoint {
        let d = east_m.hypot(north_m);
        if d <= f64::EPSILON {
            return self.origin;
        }
        destination(&self.origin, d, east_m.atan2(north_m).to_degrees())
    }
}

/// Wrap a longitude into [-180, 180).
pub fn wrap_longitude(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Mean of the distinct vertices, used as a projection origin.
///
/// Longitudes are averaged as wrapped offsets from the first vertex, so a
/// ring crossing the antimeridian stays centered on itself.
pub fn vertex_mean(points: &[GeoPoint]) -> Option<GeoPoint> {
    let first = points.first()?;
    let n = points.len() as f64;
    let lon_offset = points
        .iter()
        .map(|p| wrap_longitude(p.lon - first.lon))
        .sum::<f64>()
        / n;
    let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    Some(GeoPoint::new(wrap_longitude(first.lon + lon_offset), lat))
}

/// Signed shoelace area of a planar ring (positive = counter-clockwise).
pub fn signed_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

/// Area centroid of a planar ring; `None` when the area vanishes.
pub fn planar_centroid(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let area = signed_area(points);
    if area.abs() < 1e-9 {
        return None;
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        let cross = x1 * y2 - x2 * y1;
        cx += (x1 + x2) * cross;
        cy += (y1 + y2) * cross;
    }
    Some((cx / (6.0 * area), cy / (6.0 * area)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(0.0, 1.0));
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let p = GeoPoint::new(-117.8265, 33.6846);
        assert_eq!(haversine_distance(&p, &p), 0.0);
        assert_eq!(bearing(&p, &p), 0.0);
    }

    #[test]
    fn bearing_is_normalized() {
        let origin = GeoPoint::new(10.0, 45.0);
        let west = GeoPoint::new(9.99, 45.0);
        let b = bearing(&origin, &west);
        assert!((b - 270.0).abs() < 0.01, "got {b}");
        assert_eq!(normalize_bearing(-1e-17), 0.0);
        assert_eq!(normalize_bearing(720.0), 0.0);
        assert!((normalize_bearing(-90.0) - 270.0).abs() < 1e-12);
    }

    #[test]
    fn destination_round_trips_with_distance_and_bearing() {
        let origin = GeoPoint::new(-117.8265, 33.6846);
        let target = destination(&origin, 250.0, 37.0);
        assert!((haversine_distance(&origin, &target) - 250.0).abs() < 1e-6);
        assert!((bearing(&origin, &target) - 37.0).abs() < 1e-6);
    }

    #[test]
    fn midpoint_is_equidistant() {
        let a = GeoPoint::new(8.0, 47.0);
        let b = GeoPoint::new(8.01, 47.005);
        let m = midpoint(&a, &b);
        let da = haversine_distance(&a, &m);
        let db = haversine_distance(&m, &b);
        assert!((da - db).abs() < 1e-6);
    }

    #[test]
    fn bearing_delta_wraps() {
        assert!((bearing_delta(359.0, 1.0) - 2.0).abs() < 1e-12);
        assert!((bearing_delta(90.0, 270.0) - 180.0).abs() < 1e-12);
    }

    #[test]
    fn local_frame_round_trip() {
        let frame = LocalFrame::new(GeoPoint::new(2.35, 48.85));
        let p = frame.to_geo(120.0, -45.0);
        let (x, y) = frame.to_local(&p);
        assert!((x - 120.0).abs() < 1e-6);
        assert!((y + 45.0).abs() < 1e-6);
    }

    #[test]
    fn vertex_mean_across_antimeridian() {
        let points = [
            GeoPoint::new(179.999, -17.001),
            GeoPoint::new(-179.999, -17.001),
            GeoPoint::new(-179.999, -16.999),
            GeoPoint::new(179.999, -16.999),
        ];
        let mean = vertex_mean(&points).unwrap();
        assert!(mean.lon.abs() > 179.999, "lon {}", mean.lon);
        assert!((mean.lat + 17.0).abs() < 1e-9);
        assert!(haversine_distance(&mean, &GeoPoint::new(180.0, -17.0)) < 1e-3);

        let plain = [GeoPoint::new(8.0, 47.0), GeoPoint::new(8.2, 47.2)];
        let mean = vertex_mean(&plain).unwrap();
        assert!((mean.lon - 8.1).abs() < 1e-12 && (mean.lat - 47.1).abs() < 1e-12);
        assert!(vertex_mean(&[]).is_none());
    }

    #[test]
    fn centroid_of_square() {
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let (cx, cy) = planar_centroid(&square).unwrap();
        assert!((cx - 5.0).abs() < 1e-12 && (cy - 5.0).abs() < 1e-12);
        assert!((signed_area(&square) - 100.0).abs() < 1e-12);
        assert!(planar_centroid(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).is_none());
    }
}
