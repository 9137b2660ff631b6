//! Core data models for survey missions.

use crate::error::MissionError;
use crate::units::UnitSystem;
use serde::{Deserialize, Serialize};

/// Default tolerance in degrees for point comparisons (~0.1 mm).
pub const POINT_EPSILON_DEG: f64 = 1e-9;

/// Geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Compare with the default [`POINT_EPSILON_DEG`] tolerance.
    pub fn approx_eq(&self, other: &GeoPoint) -> bool {
        self.approx_eq_within(other, POINT_EPSILON_DEG)
    }

    pub fn approx_eq_within(&self, other: &GeoPoint, epsilon_deg: f64) -> bool {
        (self.lon - other.lon).abs() <= epsilon_deg && (self.lat - other.lat).abs() <= epsilon_deg
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// Closed ring describing the surveyed area (first == last).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundaryPolygon {
    ring: Vec<GeoPoint>,
}

impl BoundaryPolygon {
    /// Build a boundary from its vertices, closing the ring if needed.
    pub fn new(mut points: Vec<GeoPoint>) -> Self {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if !first.approx_eq(&last) {
                points.push(first);
            }
        }
        Self { ring: points }
    }

    /// The closed ring, including the repeated closing point.
    pub fn ring(&self) -> &[GeoPoint] {
        &self.ring
    }

    /// Distinct vertices (closing point dropped).
    pub fn vertices(&self) -> &[GeoPoint] {
        if self.is_closed() {
            &self.ring[..self.ring.len() - 1]
        } else {
            &self.ring
        }
    }

    pub fn is_closed(&self) -> bool {
        match (self.ring.first(), self.ring.last()) {
            (Some(first), Some(last)) => self.ring.len() > 1 && first.approx_eq(last),
            _ => false,
        }
    }

    /// Structural checks only; simplicity (no self-intersection) is assumed.
    pub fn validate(&self) -> Result<(), MissionError> {
        if !self.is_closed() {
            return Err(MissionError::InvalidGeometry(
                "boundary ring must be closed (first vertex must equal last)".to_string(),
            ));
        }
        if self.ring.iter().any(|p| !p.is_finite()) {
            return Err(MissionError::InvalidGeometry(
                "boundary contains non-finite coordinates".to_string(),
            ));
        }
        let vertices = self.vertices();
        let mut distinct: Vec<&GeoPoint> = Vec::with_capacity(vertices.len());
        for vertex in vertices {
            if !distinct.iter().any(|p| p.approx_eq(vertex)) {
                distinct.push(vertex);
            }
        }
        if distinct.len() < 3 {
            return Err(MissionError::InvalidGeometry(format!(
                "boundary needs at least 3 distinct vertices, got {}",
                distinct.len()
            )));
        }
        Ok(())
    }
}

/// Camera trigger attached to a waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAction {
    #[default]
    None,
    Photo,
    StartStopRecording,
}

/// A single point of the flight plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Opaque unique token
    pub id: String,
    pub position: GeoPoint,
    /// Meters above takeoff ground level
    pub altitude_m: f64,
    pub speed_mps: f64,
    /// 0 = horizon, -90 = nadir
    pub gimbal_pitch_deg: f64,
    /// 0 = north, clockwise
    pub heading_deg: f64,
    pub camera_action: CameraAction,
}

impl Waypoint {
    /// Create a waypoint at `position` with per-point defaults from `settings`.
    pub fn from_settings(position: GeoPoint, settings: &MissionSettings) -> Self {
        Self {
            id: new_waypoint_id(),
            position,
            altitude_m: settings.altitude_m,
            speed_mps: settings.speed_mps,
            gimbal_pitch_deg: settings.gimbal_pitch_deg,
            heading_deg: 0.0,
            camera_action: settings.camera_action,
        }
    }
}

pub(crate) fn new_waypoint_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    /// Boustrophedon sweep lines
    #[default]
    Grid,
    /// Circle around the boundary centroid
    Orbit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrbitDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

/// What the aircraft does after the last waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfMission {
    #[default]
    GoHome,
    AutoLand,
    GotoFirstWaypoint,
    Hover,
}

/// What the aircraft does when the remote-control link is lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LostLinkAction {
    #[default]
    GoBack,
    Hover,
    Land,
    Continue,
}

/// Snapshot of every user-tunable mission parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionSettings {
    pub altitude_m: f64,
    pub path_type: PathType,
    /// Overlap between adjacent sweep lines, percent
    pub side_overlap_pct: f64,
    /// Overlap between consecutive photos along a line, percent
    pub front_overlap_pct: f64,
    /// Bearing of the sweep lines, degrees
    pub sweep_angle_deg: f64,
    /// Derive the sweep angle from the longest boundary edge
    pub auto_sweep_angle: bool,
    /// Arc length between orbit waypoints, meters
    pub orbit_spacing_m: f64,
    pub orbit_start_angle_deg: f64,
    pub orbit_direction: OrbitDirection,
    /// Fly the finished sequence backwards. Headings are kept from the
    /// forward pass, so a reversed grid waypoint faces against its travel
    /// direction; combine with `lock_yaw` or re-aim downstream if needed.
    pub reverse_path: bool,
    pub straighten_legs: bool,
    pub interpolate_points: bool,
    pub lock_yaw: bool,
    pub camera_action: CameraAction,
    pub unit_system: UnitSystem,
    pub drone_profile_id: String,
    /// Used when the profile is "custom" or unknown
    pub custom_hfov_deg: f64,
    /// Used when the profile is "custom" or unknown
    pub custom_photo_cadence_s: f64,
    pub end_of_mission: EndOfMission,
    pub lost_link_action: LostLinkAction,
    pub speed_mps: f64,
    pub gimbal_pitch_deg: f64,
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            altitude_m: 50.0,
            path_type: PathType::Grid,
            side_overlap_pct: 70.0,
            front_overlap_pct: 80.0,
            sweep_angle_deg: 0.0,
            auto_sweep_angle: false,
            orbit_spacing_m: 10.0,
            orbit_start_angle_deg: 0.0,
            orbit_direction: OrbitDirection::Clockwise,
            reverse_path: false,
            straighten_legs: false,
            interpolate_points: false,
            lock_yaw: false,
            camera_action: CameraAction::Photo,
            unit_system: UnitSystem::Metric,
            drone_profile_id: "dji_mini_4_pro".to_string(),
            custom_hfov_deg: 82.1,
            custom_photo_cadence_s: 2.0,
            end_of_mission: EndOfMission::GoHome,
            lost_link_action: LostLinkAction::GoBack,
            speed_mps: 8.0,
            gimbal_pitch_deg: -90.0,
        }
    }
}

impl MissionSettings {
    /// Check the settings that every synthesis mode depends on.
    pub fn validate(&self) -> Result<(), MissionError> {
        if !self.altitude_m.is_finite() || self.altitude_m <= 0.0 {
            return Err(MissionError::InvalidConfiguration(format!(
                "altitude must be positive, got {}",
                self.altitude_m
            )));
        }
        for (name, value) in [
            ("side overlap", self.side_overlap_pct),
            ("front overlap", self.front_overlap_pct),
        ] {
            if !value.is_finite() || !(0.0..100.0).contains(&value) {
                return Err(MissionError::InvalidConfiguration(format!(
                    "{name} must be in [0, 100), got {value}"
                )));
            }
        }
        if !self.speed_mps.is_finite() || self.speed_mps < 0.0 {
            return Err(MissionError::InvalidConfiguration(format!(
                "speed cannot be negative, got {}",
                self.speed_mps
            )));
        }
        Ok(())
    }
}
