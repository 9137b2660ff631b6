//! Ground-projected camera footprint.
//!
//! The camera is a pinhole with a 4:3 sensor. Frame corners are rays in
//! camera space (x forward, y right, z up), pitched into the drone body frame
//! and intersected with the ground plane at `z = -altitude`.

use crate::models::{GeoPoint, MissionSettings, Waypoint};
use crate::profiles::resolve_camera;
use crate::rules::PlannerRules;
use crate::spatial::{destination, normalize_bearing};
use serde::{Deserialize, Serialize};

/// Sensor width / height.
pub const SENSOR_ASPECT_RATIO: f64 = 4.0 / 3.0;

/// Closed ground polygon seen by one photo, plus the pose that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Front-left, front-right, back-right, back-left, front-left
    pub ring: Vec<GeoPoint>,
    pub altitude_m: f64,
    pub heading_deg: f64,
    pub horizontal_fov_deg: f64,
    pub gimbal_pitch_deg: f64,
}

/// Vertical field of view derived from the horizontal one.
pub fn vertical_fov_deg(horizontal_fov_deg: f64) -> f64 {
    let half = (horizontal_fov_deg / 2.0).to_radians();
    2.0 * (half.tan() / SENSOR_ASPECT_RATIO).atan().to_degrees()
}

/// Nadir footprint width across the flight direction (meters).
pub fn ground_width_m(altitude_m: f64, horizontal_fov_deg: f64) -> f64 {
    2.0 * altitude_m * (horizontal_fov_deg / 2.0).to_radians().tan()
}

/// Nadir footprint height along the flight direction (meters).
pub fn ground_height_m(altitude_m: f64, horizontal_fov_deg: f64) -> f64 {
    ground_width_m(altitude_m, horizontal_fov_deg) / SENSOR_ASPECT_RATIO
}

/// Project the camera frame onto flat ground around `center`.
///
/// Returns `None` when the center is not a finite point, the altitude is not
/// positive, or the field of view is outside (0, 180) degrees.
pub fn calculate_footprint(
    center: &GeoPoint,
    altitude_m: f64,
    heading_deg: f64,
    horizontal_fov_deg: f64,
    gimbal_pitch_deg: f64,
    rules: &PlannerRules,
) -> Option<Footprint> {
    if !center.is_finite() || !altitude_m.is_finite() || altitude_m <= 0.0 {
        return None;
    }
    if !horizontal_fov_deg.is_finite() || horizontal_fov_deg <= 0.0 || horizontal_fov_deg >= 180.0
    {
        return None;
    }

    let half_h = (horizontal_fov_deg / 2.0).to_radians().tan();
    let half_v = (vertical_fov_deg(horizontal_fov_deg) / 2.0).to_radians().tan();
    let pitch = gimbal_pitch_deg.to_radians();
    let (sin_p, cos_p) = pitch.sin_cos();

    // (up, right) image-plane offsets of each corner
    let corners = [
        (half_v, -half_h),
        (half_v, half_h),
        (-half_v, half_h),
        (-half_v, -half_h),
    ];

    let mut ring = Vec::with_capacity(5);
    for (up, right) in corners {
        // forward axis (cos p, 0, sin p), up axis (-sin p, 0, cos p)
        let ray_x = cos_p - up * sin_p;
        let ray_y = right;
        let ray_z = sin_p + up * cos_p;

        let relative_deg = ray_y.atan2(ray_x).to_degrees();
        let ground_distance = if ray_z >= -rules.ground_ray_epsilon {
            altitude_m * rules.horizon_clamp_factor
        } else {
            -altitude_m / ray_z * ray_x.hypot(ray_y)
        };

        ring.push(destination(
            center,
            ground_distance,
            normalize_bearing(heading_deg + relative_deg),
        ));
    }
    ring.push(ring[0]);

    Some(Footprint {
        ring,
        altitude_m,
        heading_deg,
        horizontal_fov_deg,
        gimbal_pitch_deg,
    })
}

/// Footprint of an existing waypoint, with the FOV resolved from its profile.
pub fn footprint_for_waypoint(
    waypoint: &Waypoint,
    settings: &MissionSettings,
    rules: &PlannerRules,
) -> Option<Footprint> {
    let camera = resolve_camera(settings);
    calculate_footprint(
        &waypoint.position,
        waypoint.altitude_m,
        waypoint.heading_deg,
        camera.horizontal_fov_deg,
        waypoint.gimbal_pitch_deg,
        rules,
    )
}
