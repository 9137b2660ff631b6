//! Flight metrics: distance, safe speed, duration and battery warnings.
//!
//! Nothing here returns an error. Degenerate inputs (empty paths, zero
//! cadence, NaN) collapse to 0 so callers can display the result directly.

use crate::models::{MissionSettings, Waypoint};
use crate::path_engine::photo_spacing_m;
use crate::profiles::resolve_camera;
use crate::rules::PlannerRules;
use crate::spatial::haversine_distance;
use serde::{Deserialize, Serialize};

/// Battery-time classification of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    /// Within the warning ratio, or the profile has no time limit
    Safe,
    /// At or above the warning ratio
    Warning,
    /// At or above the critical ratio
    Critical,
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Sum of consecutive leg distances in meters.
pub fn total_distance(waypoints: &[Waypoint]) -> f64 {
    let total = waypoints
        .windows(2)
        .map(|leg| haversine_distance(&leg[0].position, &leg[1].position))
        .sum::<f64>();
    finite_or_zero(total)
}

/// Shortest consecutive leg in meters; 0 for fewer than two waypoints.
pub fn minimum_leg_distance(waypoints: &[Waypoint]) -> f64 {
    let min = waypoints
        .windows(2)
        .map(|leg| haversine_distance(&leg[0].position, &leg[1].position))
        .fold(f64::INFINITY, f64::min);
    finite_or_zero(min)
}

/// Fastest speed that still allows one photo per leg.
pub fn max_safe_speed(waypoints: &[Waypoint], photo_cadence_s: f64) -> f64 {
    if !photo_cadence_s.is_finite() || photo_cadence_s <= 0.0 {
        return 0.0;
    }
    finite_or_zero(minimum_leg_distance(waypoints) / photo_cadence_s)
}

/// Forward travel between photos that keeps the configured front overlap.
pub fn forward_overlap_distance(
    altitude_m: f64,
    horizontal_fov_deg: f64,
    front_overlap_pct: f64,
) -> f64 {
    finite_or_zero(photo_spacing_m(
        altitude_m,
        horizontal_fov_deg,
        front_overlap_pct,
    ))
}

/// Safe speed bounded by the lesser of the shortest leg and the
/// forward-overlap distance.
///
/// A non-positive `forward_overlap_m` leaves only the leg bound.
pub fn max_safe_speed_with_overlap(
    waypoints: &[Waypoint],
    photo_cadence_s: f64,
    forward_overlap_m: f64,
) -> f64 {
    if !photo_cadence_s.is_finite() || photo_cadence_s <= 0.0 {
        return 0.0;
    }
    let leg = minimum_leg_distance(waypoints);
    let bound = if forward_overlap_m.is_finite() && forward_overlap_m > 0.0 && leg > 0.0 {
        leg.min(forward_overlap_m)
    } else {
        leg
    };
    finite_or_zero(bound / photo_cadence_s)
}

/// Estimated mission duration in whole seconds.
///
/// A speed of 0 (or less) returns the overhead alone.
pub fn mission_time_s(total_distance_m: f64, speed_mps: f64, overhead_s: f64) -> f64 {
    let overhead = finite_or_zero(overhead_s);
    if !speed_mps.is_finite() || speed_mps <= 0.0 {
        return overhead.round();
    }
    (finite_or_zero(total_distance_m) / speed_mps + overhead).round()
}

/// Classify a mission time against the profile's flight-time limit.
pub fn warning_level(
    mission_time_s: f64,
    max_flight_time_min: f64,
    rules: &PlannerRules,
) -> WarningLevel {
    if !max_flight_time_min.is_finite() || max_flight_time_min <= 0.0 {
        return WarningLevel::Safe;
    }
    let ratio = finite_or_zero(mission_time_s) / (max_flight_time_min * 60.0);
    if ratio >= rules.critical_ratio {
        WarningLevel::Critical
    } else if ratio >= rules.warning_ratio {
        WarningLevel::Warning
    } else {
        WarningLevel::Safe
    }
}

/// All metrics for one waypoint sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightMetrics {
    pub waypoint_count: usize,
    pub total_distance_m: f64,
    pub min_leg_distance_m: f64,
    pub forward_overlap_distance_m: f64,
    pub max_safe_speed_mps: f64,
    /// Configured speed capped at the safe speed
    pub effective_speed_mps: f64,
    pub mission_time_s: f64,
    pub max_flight_time_min: f64,
    pub warning_level: WarningLevel,
}

/// Evaluate a waypoint sequence against the settings it was planned with.
pub fn evaluate_mission(
    waypoints: &[Waypoint],
    settings: &MissionSettings,
    rules: &PlannerRules,
) -> FlightMetrics {
    let camera = resolve_camera(settings);
    let total = total_distance(waypoints);
    let forward = forward_overlap_distance(
        settings.altitude_m,
        camera.horizontal_fov_deg,
        settings.front_overlap_pct,
    );
    let safe = max_safe_speed_with_overlap(waypoints, camera.photo_cadence_s, forward);
    let configured = finite_or_zero(settings.speed_mps);
    let effective = if safe > 0.0 {
        configured.min(safe)
    } else {
        configured
    };
    let time = mission_time_s(total, effective, rules.takeoff_landing_overhead_s);

    FlightMetrics {
        waypoint_count: waypoints.len(),
        total_distance_m: total,
        min_leg_distance_m: minimum_leg_distance(waypoints),
        forward_overlap_distance_m: forward,
        max_safe_speed_mps: safe,
        effective_speed_mps: effective,
        mission_time_s: time,
        max_flight_time_min: camera.max_flight_time_min,
        warning_level: warning_level(time, camera.max_flight_time_min, rules),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use crate::spatial::destination;

    fn line(legs_m: &[f64]) -> Vec<Waypoint> {
        let settings = MissionSettings::default();
        let mut position = GeoPoint::new(-117.8265, 33.6846);
        let mut waypoints = vec![Waypoint::from_settings(position, &settings)];
        for leg in legs_m {
            position = destination(&position, *leg, 90.0);
            waypoints.push(Waypoint::from_settings(position, &settings));
        }
        waypoints
    }

    #[test]
    fn distances_sum_and_minimum() {
        let waypoints = line(&[100.0, 20.0, 50.0]);
        assert!((total_distance(&waypoints) - 170.0).abs() < 1e-6);
        assert!((minimum_leg_distance(&waypoints) - 20.0).abs() < 1e-6);
    }

    #[test]
    fn single_waypoint_clamps_to_zero() {
        let waypoints = line(&[]);
        assert_eq!(total_distance(&waypoints), 0.0);
        assert_eq!(minimum_leg_distance(&waypoints), 0.0);
        assert_eq!(max_safe_speed(&waypoints, 2.0), 0.0);
        assert_eq!(max_safe_speed(&[], 2.0), 0.0);
    }

    #[test]
    fn safe_speed_bounded_by_cadence() {
        let waypoints = line(&[100.0, 20.0]);
        assert!((max_safe_speed(&waypoints, 2.0) - 10.0).abs() < 1e-6);
        assert_eq!(max_safe_speed(&waypoints, 0.0), 0.0);
        assert_eq!(max_safe_speed(&waypoints, f64::NAN), 0.0);
    }

    #[test]
    fn overlap_bound_takes_the_lesser_distance() {
        let waypoints = line(&[100.0, 20.0]);
        assert!((max_safe_speed_with_overlap(&waypoints, 2.0, 13.0) - 6.5).abs() < 1e-6);
        assert!((max_safe_speed_with_overlap(&waypoints, 2.0, 40.0) - 10.0).abs() < 1e-6);
        assert!((max_safe_speed_with_overlap(&waypoints, 2.0, 0.0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn zero_speed_returns_overhead() {
        assert_eq!(mission_time_s(1000.0, 0.0, 60.0), 60.0);
        assert_eq!(mission_time_s(1000.0, 10.0, 60.0), 160.0);
        assert_eq!(mission_time_s(1001.0, 3.0, 0.0), 334.0);
    }

    #[test]
    fn warning_tiers() {
        let rules = PlannerRules::default();
        // 10 minute limit
        assert_eq!(warning_level(509.0, 10.0, &rules), WarningLevel::Safe);
        assert_eq!(warning_level(510.0, 10.0, &rules), WarningLevel::Warning);
        assert_eq!(warning_level(599.0, 10.0, &rules), WarningLevel::Warning);
        assert_eq!(warning_level(600.0, 10.0, &rules), WarningLevel::Critical);
        assert_eq!(warning_level(1e9, 0.0, &rules), WarningLevel::Safe);
    }

    #[test]
    fn thresholds_come_from_rules() {
        let rules = PlannerRules {
            warning_ratio: 0.5,
            critical_ratio: 0.9,
            ..PlannerRules::default()
        };
        assert_eq!(warning_level(300.0, 10.0, &rules), WarningLevel::Warning);
        assert_eq!(warning_level(540.0, 10.0, &rules), WarningLevel::Critical);
    }

    #[test]
    fn evaluate_caps_speed_at_safe_speed() {
        let settings = MissionSettings {
            speed_mps: 15.0,
            drone_profile_id: "custom".into(),
            custom_photo_cadence_s: 2.0,
            ..MissionSettings::default()
        };
        let waypoints = line(&[20.0, 20.0]);
        let metrics = evaluate_mission(&waypoints, &settings, &PlannerRules::default());
        assert!(metrics.effective_speed_mps <= metrics.max_safe_speed_mps + 1e-12);
        assert!(metrics.effective_speed_mps > 0.0);
        assert_eq!(metrics.warning_level, WarningLevel::Safe);
        assert_eq!(metrics.waypoint_count, 3);
    }
}
