//! Survey path synthesis: boustrophedon grids and orbits.
//!
//! Synthesis is a pure function of the boundary, the settings snapshot and the
//! planner rules. Invalid input never panics or returns `Err`; it produces an
//! empty waypoint list with a diagnostic, since a half-drawn polygon is a
//! normal editing state.

use crate::error::MissionError;
use crate::footprint::{ground_height_m, ground_width_m};
use crate::models::{BoundaryPolygon, GeoPoint, MissionSettings, OrbitDirection, PathType, Waypoint};
use crate::profiles::{resolve_camera, CameraParams};
use crate::rules::PlannerRules;
use crate::spatial::{
    bearing, bearing_delta, destination, haversine_distance, normalize_bearing, planar_centroid,
    signed_area, vertex_mean, LocalFrame,
};
use serde::Serialize;
use std::cmp::Ordering;

const MIN_AREA_M2: f64 = 1e-6;

/// Outcome of one synthesis call.
#[derive(Debug)]
pub struct PathSynthesisResult {
    pub success: bool,
    pub waypoints: Vec<Waypoint>,
    pub stats: Option<PathStats>,
    /// Why the waypoint list is empty, when it is
    pub diagnostic: Option<MissionError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PathStats {
    Grid {
        sweep_angle_deg: f64,
        line_spacing_m: f64,
        photo_spacing_m: f64,
        line_count: usize,
        segment_count: usize,
    },
    Orbit {
        center: GeoPoint,
        radius_m: f64,
        step_deg: f64,
    },
}

/// Synthesize the waypoint sequence covering `boundary`.
pub fn synthesize_path(
    boundary: &BoundaryPolygon,
    settings: &MissionSettings,
    rules: &PlannerRules,
) -> PathSynthesisResult {
    match try_synthesize(boundary, settings, rules) {
        Ok((waypoints, stats)) => {
            tracing::debug!(
                waypoints = waypoints.len(),
                path_type = ?settings.path_type,
                "path synthesized"
            );
            PathSynthesisResult {
                success: true,
                waypoints,
                stats: Some(stats),
                diagnostic: None,
            }
        }
        Err(error) => {
            tracing::warn!(%error, "path synthesis produced no waypoints");
            PathSynthesisResult {
                success: false,
                waypoints: Vec::new(),
                stats: None,
                diagnostic: Some(error),
            }
        }
    }
}

fn try_synthesize(
    boundary: &BoundaryPolygon,
    settings: &MissionSettings,
    rules: &PlannerRules,
) -> Result<(Vec<Waypoint>, PathStats), MissionError> {
    boundary.validate()?;
    settings.validate()?;
    let camera = resolve_camera(settings);
    validate_camera(&camera)?;

    let (mut waypoints, stats) = match settings.path_type {
        PathType::Grid => grid_path(boundary, settings, &camera, rules)?,
        PathType::Orbit => orbit_path(boundary, settings, rules)?,
    };

    if settings.reverse_path {
        waypoints.reverse();
    }
    Ok((waypoints, stats))
}

fn validate_camera(camera: &CameraParams) -> Result<(), MissionError> {
    let fov = camera.horizontal_fov_deg;
    if !fov.is_finite() || fov <= 0.0 || fov >= 180.0 {
        return Err(MissionError::InvalidConfiguration(format!(
            "horizontal field of view must be in (0, 180), got {fov}"
        )));
    }
    let cadence = camera.photo_cadence_s;
    if !cadence.is_finite() || cadence <= 0.0 {
        return Err(MissionError::InvalidConfiguration(format!(
            "photo cadence must be positive, got {cadence}"
        )));
    }
    Ok(())
}

/// Distance between adjacent sweep lines.
pub fn line_spacing_m(altitude_m: f64, horizontal_fov_deg: f64, side_overlap_pct: f64) -> f64 {
    ground_width_m(altitude_m, horizontal_fov_deg) * (1.0 - side_overlap_pct / 100.0)
}

/// Forward travel between two photos along a sweep line.
pub fn photo_spacing_m(altitude_m: f64, horizontal_fov_deg: f64, front_overlap_pct: f64) -> f64 {
    ground_height_m(altitude_m, horizontal_fov_deg) * (1.0 - front_overlap_pct / 100.0)
}

/// Bearing of the longest boundary edge, folded into [0, 180).
pub fn dominant_edge_bearing(boundary: &BoundaryPolygon) -> f64 {
    let ring = boundary.ring();
    let mut best_len = 0.0;
    let mut best_bearing = 0.0;
    for edge in ring.windows(2) {
        let len = haversine_distance(&edge[0], &edge[1]);
        if len > best_len {
            best_len = len;
            best_bearing = bearing(&edge[0], &edge[1]);
        }
    }
    normalize_bearing(best_bearing) % 180.0
}

// ========== GRID ==========

fn grid_path(
    boundary: &BoundaryPolygon,
    settings: &MissionSettings,
    camera: &CameraParams,
    rules: &PlannerRules,
) -> Result<(Vec<Waypoint>, PathStats), MissionError> {
    let altitude = settings.altitude_m;
    let fov = camera.horizontal_fov_deg;
    let spacing = line_spacing_m(altitude, fov, settings.side_overlap_pct);
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(MissionError::InvalidGeometry(format!(
            "line spacing must be positive, got {spacing}"
        )));
    }
    let photo_spacing = photo_spacing_m(altitude, fov, settings.front_overlap_pct);

    let vertices = boundary.vertices();
    let origin = vertex_mean(vertices)
        .ok_or_else(|| MissionError::InvalidGeometry("boundary has no vertices".to_string()))?;
    let frame = LocalFrame::new(origin);
    let local: Vec<(f64, f64)> = vertices.iter().map(|p| frame.to_local(p)).collect();
    if signed_area(&local).abs() < MIN_AREA_M2 {
        return Err(MissionError::InvalidGeometry(
            "boundary encloses no area".to_string(),
        ));
    }

    let sweep_angle = if settings.auto_sweep_angle {
        dominant_edge_bearing(boundary)
    } else {
        normalize_bearing(settings.sweep_angle_deg)
    };
    let axes = SweepAxes::new(sweep_angle);
    let rotated: Vec<(f64, f64)> = local.iter().map(|&p| axes.project(p)).collect();

    let (u_min, u_max) = min_max(rotated.iter().map(|p| p.0));
    let (v_min, v_max) = min_max(rotated.iter().map(|p| p.1));
    let extent = u_max - u_min;
    let line_count = ((extent / spacing).ceil() as usize).max(1);
    let first_offset = (extent - (line_count - 1) as f64 * spacing) / 2.0;
    let v_lo = v_min - rules.sweep_padding_m;
    let v_hi = v_max + rules.sweep_padding_m;

    let mut corners: Vec<(f64, f64)> = Vec::new();
    let mut segment_count = 0usize;
    let mut covered_lines = 0usize;
    for k in 0..line_count {
        let u = u_min + first_offset + k as f64 * spacing;
        let mut segments: Vec<(f64, f64)> = clip_sweep_line(&rotated, u, v_lo, v_hi)
            .into_iter()
            .filter(|(start, end)| end - start >= rules.min_segment_length_m)
            .collect();
        if segments.is_empty() {
            continue;
        }
        // alternate travel direction on every line that produced a segment
        if covered_lines % 2 == 1 {
            segments.reverse();
            for segment in &mut segments {
                *segment = (segment.1, segment.0);
            }
        }
        for (start, end) in &segments {
            corners.push((u, *start));
            corners.push((u, *end));
        }
        segment_count += segments.len();
        covered_lines += 1;
    }

    tracing::debug!(
        sweep_angle,
        spacing,
        line_count,
        segment_count,
        "grid sweep lines clipped"
    );

    if corners.is_empty() {
        return Err(MissionError::InvalidGeometry(
            "no sweep line intersects the boundary".to_string(),
        ));
    }

    let corner_points: Vec<GeoPoint> = corners
        .iter()
        .map(|&(u, v)| {
            let (x, y) = axes.unproject(u, v);
            frame.to_geo(x, y)
        })
        .collect();

    let positions = if settings.interpolate_points {
        densify(&corner_points, photo_spacing)
    } else {
        corner_points
    };

    let mut waypoints: Vec<Waypoint> = positions
        .into_iter()
        .map(|p| Waypoint::from_settings(p, settings))
        .collect();
    assign_headings(&mut waypoints, settings.lock_yaw);

    if settings.straighten_legs {
        waypoints = straighten(
            waypoints,
            rules.straighten_tolerance_deg,
            rules.point_epsilon_deg,
        );
    }

    Ok((
        waypoints,
        PathStats::Grid {
            sweep_angle_deg: sweep_angle,
            line_spacing_m: spacing,
            photo_spacing_m: photo_spacing,
            line_count: covered_lines,
            segment_count,
        },
    ))
}

/// Orthonormal axes of the sweep: `v` runs along the lines, `u` across them.
#[derive(Debug, Clone, Copy)]
struct SweepAxes {
    sin: f64,
    cos: f64,
}

impl SweepAxes {
    fn new(sweep_angle_deg: f64) -> Self {
        let (sin, cos) = sweep_angle_deg.to_radians().sin_cos();
        Self { sin, cos }
    }

    /// (east, north) -> (across, along)
    fn project(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x * self.cos - y * self.sin, x * self.sin + y * self.cos)
    }

    /// (across, along) -> (east, north)
    fn unproject(&self, u: f64, v: f64) -> (f64, f64) {
        (u * self.cos + v * self.sin, -u * self.sin + v * self.cos)
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Intervals of the line `across = u` that lie inside the ring, as (start, end)
/// along-track coordinates sorted ascending.
///
/// Uses the same half-open crossing rule as ray casting, so a line through a
/// vertex is counted once.
fn clip_sweep_line(ring: &[(f64, f64)], u: f64, v_lo: f64, v_hi: f64) -> Vec<(f64, f64)> {
    let n = ring.len();
    let mut crossings: Vec<f64> = Vec::new();
    for i in 0..n {
        let (u1, v1) = ring[i];
        let (u2, v2) = ring[(i + 1) % n];
        if (u1 <= u) != (u2 <= u) {
            let t = (u - u1) / (u2 - u1);
            crossings.push((v1 + t * (v2 - v1)).clamp(v_lo, v_hi));
        }
    }
    crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    crossings
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// Insert intermediate points so no leg is longer than `max_spacing_m`.
fn densify(points: &[GeoPoint], max_spacing_m: f64) -> Vec<GeoPoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    if !max_spacing_m.is_finite() || max_spacing_m <= 0.0 {
        return points.to_vec();
    }
    let mut out = vec![*first];
    for leg in points.windows(2) {
        let (start, end) = (&leg[0], &leg[1]);
        let distance_m = haversine_distance(start, end);
        let steps = (distance_m / max_spacing_m).ceil().max(1.0) as usize;
        let heading = bearing(start, end);
        for step in 1..steps {
            let fraction = step as f64 / steps as f64;
            out.push(destination(start, distance_m * fraction, heading));
        }
        out.push(*end);
    }
    out
}

/// Heading = bearing of the outgoing leg; the last point keeps its incoming bearing.
fn assign_headings(waypoints: &mut [Waypoint], lock_yaw: bool) {
    let n = waypoints.len();
    if n < 2 {
        return;
    }
    let first_leg = bearing(&waypoints[0].position, &waypoints[1].position);
    for i in 0..n {
        waypoints[i].heading_deg = if lock_yaw {
            first_leg
        } else if i + 1 < n {
            bearing(&waypoints[i].position, &waypoints[i + 1].position)
        } else {
            bearing(&waypoints[i - 1].position, &waypoints[i].position)
        };
    }
}

/// Drop waypoints that continue the previous leg within `tolerance_deg`.
fn straighten(waypoints: Vec<Waypoint>, tolerance_deg: f64, epsilon_deg: f64) -> Vec<Waypoint> {
    if waypoints.len() <= 2 {
        return waypoints;
    }
    let last_index = waypoints.len() - 1;
    let mut kept: Vec<Waypoint> = Vec::with_capacity(waypoints.len());
    for (i, waypoint) in waypoints.iter().enumerate() {
        let keep = match kept.last() {
            Some(anchor) if i < last_index => {
                let incoming = bearing(&anchor.position, &waypoint.position);
                let outgoing = bearing(&waypoint.position, &waypoints[i + 1].position);
                !anchor.position.approx_eq_within(&waypoint.position, epsilon_deg)
                    && bearing_delta(incoming, outgoing) > tolerance_deg
            }
            _ => true,
        };
        if keep {
            kept.push(waypoint.clone());
        }
    }
    kept
}

// ========== ORBIT ==========

fn orbit_path(
    boundary: &BoundaryPolygon,
    settings: &MissionSettings,
    rules: &PlannerRules,
) -> Result<(Vec<Waypoint>, PathStats), MissionError> {
    let spacing = settings.orbit_spacing_m;
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(MissionError::InvalidConfiguration(format!(
            "orbit spacing must be positive, got {spacing}"
        )));
    }

    let vertices = boundary.vertices();
    let origin = vertex_mean(vertices)
        .ok_or_else(|| MissionError::InvalidGeometry("boundary has no vertices".to_string()))?;
    let frame = LocalFrame::new(origin);
    let local: Vec<(f64, f64)> = vertices.iter().map(|p| frame.to_local(p)).collect();
    let (cx, cy) = planar_centroid(&local).ok_or_else(|| {
        MissionError::InvalidGeometry("boundary encloses no area".to_string())
    })?;
    let center = frame.to_geo(cx, cy);

    let radius = vertices
        .iter()
        .map(|v| haversine_distance(&center, v))
        .sum::<f64>()
        / vertices.len() as f64;
    if !radius.is_finite() || radius < rules.min_orbit_radius_m {
        return Err(MissionError::InvalidGeometry(format!(
            "orbit radius too small: {radius:.3} m"
        )));
    }

    let step_deg = (spacing / radius).to_degrees();
    let count = (360.0 / step_deg - 1e-9).ceil().max(1.0) as usize;
    if count > rules.max_orbit_waypoints {
        return Err(MissionError::InvalidConfiguration(format!(
            "orbit spacing {spacing} m yields {count} waypoints (max {})",
            rules.max_orbit_waypoints
        )));
    }
    let direction = match settings.orbit_direction {
        OrbitDirection::Clockwise => 1.0,
        OrbitDirection::CounterClockwise => -1.0,
    };

    tracing::debug!(radius, step_deg, count, "orbit generated");

    let waypoints = (0..count)
        .map(|k| {
            let angle = settings.orbit_start_angle_deg + direction * k as f64 * step_deg;
            let position = destination(&center, radius, normalize_bearing(angle));
            let mut waypoint = Waypoint::from_settings(position, settings);
            waypoint.heading_deg = bearing(&position, &center);
            waypoint
        })
        .collect();

    Ok((
        waypoints,
        PathStats::Orbit {
            center,
            radius_m: radius,
            step_deg,
        },
    ))
}
