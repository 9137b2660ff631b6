//! Tunable thresholds for path synthesis and flight metrics.

use crate::models::POINT_EPSILON_DEG;
use serde::{Deserialize, Serialize};

/// Planner-wide thresholds. Callers load these once and pass them to every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerRules {
    /// Clipped sweep segments shorter than this are dropped (meters)
    pub min_segment_length_m: f64,
    /// Extra length added to both ends of every sweep line before clipping (meters)
    pub sweep_padding_m: f64,
    /// Max bearing change for a waypoint to count as collinear (degrees)
    pub straighten_tolerance_deg: f64,
    /// Tolerance for point equality (degrees)
    pub point_epsilon_deg: f64,
    /// Orbit radius below this is treated as degenerate (meters)
    pub min_orbit_radius_m: f64,
    /// Upper bound on orbit waypoints; more is rejected as a configuration error
    pub max_orbit_waypoints: usize,
    /// Horizon rays are clamped to altitude * this factor
    pub horizon_clamp_factor: f64,
    /// Rays whose downward component is above -epsilon never reach the ground
    pub ground_ray_epsilon: f64,
    /// Added to every mission time estimate (seconds)
    pub takeoff_landing_overhead_s: f64,
    /// Fraction of the flight-time limit at which a mission becomes a warning
    pub warning_ratio: f64,
    /// Fraction of the flight-time limit at which a mission becomes critical
    pub critical_ratio: f64,
}

impl Default for PlannerRules {
    fn default() -> Self {
        Self {
            min_segment_length_m: 1.0,
            sweep_padding_m: 10.0,
            straighten_tolerance_deg: 1.0,
            point_epsilon_deg: POINT_EPSILON_DEG,
            min_orbit_radius_m: 0.5,
            max_orbit_waypoints: 20_000,
            horizon_clamp_factor: 10.0,
            ground_ray_epsilon: 1e-6,
            takeoff_landing_overhead_s: 60.0,
            warning_ratio: 0.85,
            critical_ratio: 1.0,
        }
    }
}
