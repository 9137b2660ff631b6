//! Interchange form of a mission and its GeoJSON representation.

use crate::error::{CodecCause, MissionError};
use crate::models::{
    new_waypoint_id, BoundaryPolygon, CameraAction, EndOfMission, GeoPoint, LostLinkAction,
    MissionSettings, Waypoint,
};
use chrono::{DateTime, Utc};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

const SESSION_SETTINGS_KEY: &str = "sessionSettings";
const SESSION_BOUNDARY_KEY: &str = "sessionBoundaryPolygon";
const MISSION_CONFIG_KEY: &str = "missionConfig";

/// Editing state embedded in an exported mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBlock {
    pub settings: MissionSettings,
    pub boundary: BoundaryPolygon,
}

/// A mission as stored in a file: waypoints plus optional session data.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionFile {
    pub waypoints: Vec<Waypoint>,
    pub session_settings: Option<MissionSettings>,
    pub session_boundary: Option<BoundaryPolygon>,
    pub end_of_mission: EndOfMission,
    pub lost_link_action: LostLinkAction,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of a successful import.
#[derive(Debug)]
pub struct ImportOutcome {
    pub mission: MissionFile,
    /// `PartialRestore` when the session data was absent or unreadable
    pub notice: Option<MissionError>,
}

impl ImportOutcome {
    /// Settings + boundary, present only when both were restored.
    pub fn session(&self) -> Option<SessionBlock> {
        match (&self.mission.session_settings, &self.mission.session_boundary) {
            (Some(settings), Some(boundary)) => Some(SessionBlock {
                settings: settings.clone(),
                boundary: boundary.clone(),
            }),
            _ => None,
        }
    }
}

impl MissionFile {
    /// Full-fidelity mission carrying the settings and boundary it was planned from.
    pub fn new(
        waypoints: Vec<Waypoint>,
        settings: &MissionSettings,
        boundary: &BoundaryPolygon,
    ) -> Self {
        Self {
            waypoints,
            session_settings: Some(settings.clone()),
            session_boundary: Some(boundary.clone()),
            end_of_mission: settings.end_of_mission,
            lost_link_action: settings.lost_link_action,
            created_at: None,
            updated_at: None,
        }
    }

    /// Mission without editing state, as produced by peer tools.
    pub fn waypoints_only(waypoints: Vec<Waypoint>, defaults: &MissionSettings) -> Self {
        Self {
            waypoints,
            session_settings: None,
            session_boundary: None,
            end_of_mission: defaults.end_of_mission,
            lost_link_action: defaults.lost_link_action,
            created_at: None,
            updated_at: None,
        }
    }

    /// Waypoints as point features; session data in foreign members.
    pub fn to_feature_collection(&self) -> Result<FeatureCollection, MissionError> {
        let features = self
            .waypoints
            .iter()
            .enumerate()
            .map(|(index, waypoint)| waypoint_to_feature(index, waypoint))
            .collect();

        let mut members = JsonObject::new();
        members.insert(
            MISSION_CONFIG_KEY.to_string(),
            serde_json::json!({
                "end_of_mission": self.end_of_mission,
                "lost_link_action": self.lost_link_action,
            }),
        );
        if let Some(settings) = &self.session_settings {
            let value = serde_json::to_value(settings)
                .map_err(|e| MissionError::encode("session settings", e))?;
            members.insert(SESSION_SETTINGS_KEY.to_string(), value);
        }
        if let Some(boundary) = &self.session_boundary {
            let value = serde_json::to_value(boundary)
                .map_err(|e| MissionError::encode("session boundary", e))?;
            members.insert(SESSION_BOUNDARY_KEY.to_string(), value);
        }

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(members),
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, MissionError> {
        let collection = self.to_feature_collection()?;
        serde_json::to_string_pretty(&collection)
            .map_err(|e| MissionError::encode("GeoJSON document", e))
    }

    /// Parse a GeoJSON FeatureCollection of waypoint features.
    ///
    /// Per-point fields missing from a feature fall back to `defaults`.
    /// Missing or malformed session members degrade to a `PartialRestore`
    /// notice instead of failing the import.
    pub fn from_geojson_str(
        input: &str,
        defaults: &MissionSettings,
    ) -> Result<ImportOutcome, MissionError> {
        let geojson: GeoJson = input
            .parse()
            .map_err(|e: geojson::Error| MissionError::decode("GeoJSON document", e))?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(MissionError::decode(
                "GeoJSON document",
                CodecCause::Malformed("expected a FeatureCollection".to_string()),
            ));
        };

        let mut indexed: Vec<(Option<u64>, Waypoint)> = Vec::new();
        for (position, feature) in collection.features.iter().enumerate() {
            if let Some(entry) = feature_to_waypoint(position, feature, defaults)? {
                indexed.push(entry);
            }
        }
        if indexed.iter().all(|(index, _)| index.is_some()) {
            indexed.sort_by_key(|(index, _)| *index);
        }
        let waypoints: Vec<Waypoint> = indexed.into_iter().map(|(_, w)| w).collect();

        let members = collection.foreign_members.unwrap_or_default();
        let mut mission = MissionFile::waypoints_only(waypoints, defaults);
        if let Some(config) = members.get(MISSION_CONFIG_KEY) {
            if let Some(end) = config
                .get("end_of_mission")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
            {
                mission.end_of_mission = end;
            }
            if let Some(lost) = config
                .get("lost_link_action")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
            {
                mission.lost_link_action = lost;
            }
        }

        let notice = restore_session_members(&members, &mut mission);
        Ok(ImportOutcome { mission, notice })
    }
}

fn restore_session_members(members: &JsonObject, mission: &mut MissionFile) -> Option<MissionError> {
    let settings = members.get(SESSION_SETTINGS_KEY);
    let boundary = members.get(SESSION_BOUNDARY_KEY);
    let (Some(settings), Some(boundary)) = (settings, boundary) else {
        tracing::warn!("GeoJSON mission has no session data, importing waypoints only");
        return Some(MissionError::PartialRestore(
            "document has no session settings or boundary".to_string(),
        ));
    };

    let parsed = serde_json::from_value::<MissionSettings>(settings.clone()).and_then(|s| {
        serde_json::from_value::<BoundaryPolygon>(boundary.clone()).map(|b| (s, b))
    });
    match parsed {
        Ok((settings, boundary)) => {
            mission.session_settings = Some(settings);
            mission.session_boundary = Some(boundary);
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "GeoJSON session data is malformed, importing waypoints only");
            Some(MissionError::PartialRestore(format!(
                "session data is malformed: {e}"
            )))
        }
    }
}

fn waypoint_to_feature(index: usize, waypoint: &Waypoint) -> Feature {
    let geometry = Geometry::new(Value::Point(vec![
        waypoint.position.lon,
        waypoint.position.lat,
    ]));

    let mut props = JsonObject::new();
    props.insert("index".to_string(), JsonValue::from(index as u64));
    props.insert("altitude_m".to_string(), JsonValue::from(waypoint.altitude_m));
    props.insert("speed_mps".to_string(), JsonValue::from(waypoint.speed_mps));
    props.insert(
        "gimbal_pitch_deg".to_string(),
        JsonValue::from(waypoint.gimbal_pitch_deg),
    );
    props.insert("heading_deg".to_string(), JsonValue::from(waypoint.heading_deg));
    props.insert(
        "camera_action".to_string(),
        serde_json::to_value(waypoint.camera_action).unwrap_or(JsonValue::Null),
    );

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(Id::String(waypoint.id.clone())),
        properties: Some(props),
        foreign_members: None,
    }
}

/// Non-point features are skipped (`Ok(None)`).
fn feature_to_waypoint(
    position: usize,
    feature: &Feature,
    defaults: &MissionSettings,
) -> Result<Option<(Option<u64>, Waypoint)>, MissionError> {
    let Some(Value::Point(coords)) = feature.geometry.as_ref().map(|g| &g.value) else {
        return Ok(None);
    };
    let point = position_to_point(coords).ok_or_else(|| {
        MissionError::decode(
            "GeoJSON document",
            CodecCause::Malformed(format!("feature {position} has an invalid point")),
        )
    })?;

    let number = |key: &str, fallback: f64| {
        feature
            .property(key)
            .and_then(JsonValue::as_f64)
            .unwrap_or(fallback)
    };
    let camera_action = feature
        .property("camera_action")
        .and_then(|v| serde_json::from_value::<CameraAction>(v.clone()).ok())
        .unwrap_or(defaults.camera_action);
    let id = match &feature.id {
        Some(Id::String(id)) => id.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => new_waypoint_id(),
    };

    let waypoint = Waypoint {
        id,
        position: point,
        altitude_m: number("altitude_m", defaults.altitude_m),
        speed_mps: number("speed_mps", defaults.speed_mps),
        gimbal_pitch_deg: number("gimbal_pitch_deg", defaults.gimbal_pitch_deg),
        heading_deg: number("heading_deg", 0.0),
        camera_action,
    };
    let index = feature.property("index").and_then(JsonValue::as_u64);
    Ok(Some((index, waypoint)))
}

fn position_to_point(coords: &[f64]) -> Option<GeoPoint> {
    match coords {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some(GeoPoint::new(*lon, *lat)),
        _ => None,
    }
}

impl BoundaryPolygon {
    /// Read a boundary from a GeoJSON Polygon geometry, a Feature, or the
    /// first polygon Feature of a FeatureCollection. Only the exterior ring is
    /// used; an unclosed ring is closed.
    pub fn from_geojson(input: &str) -> Result<Self, MissionError> {
        let geojson: GeoJson = input
            .parse()
            .map_err(|e: geojson::Error| MissionError::decode("boundary GeoJSON", e))?;
        let geometry = match geojson {
            GeoJson::Geometry(geometry) => Some(geometry),
            GeoJson::Feature(feature) => feature.geometry,
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .filter_map(|f| f.geometry)
                .find(|g| matches!(g.value, Value::Polygon(_))),
        };
        let Some(Geometry {
            value: Value::Polygon(rings),
            ..
        }) = geometry
        else {
            return Err(MissionError::InvalidGeometry(
                "GeoJSON contains no Polygon geometry".to_string(),
            ));
        };
        let exterior = rings.into_iter().next().unwrap_or_default();
        let points = exterior
            .iter()
            .map(|coords| position_to_point(coords))
            .collect::<Option<Vec<GeoPoint>>>()
            .ok_or_else(|| {
                MissionError::decode(
                    "boundary GeoJSON",
                    CodecCause::Malformed("polygon has an invalid position".to_string()),
                )
            })?;
        Ok(BoundaryPolygon::new(points))
    }

    pub fn to_geojson_geometry(&self) -> Geometry {
        let ring = self.ring().iter().map(|p| vec![p.lon, p.lat]).collect();
        Geometry::new(Value::Polygon(vec![ring]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_waypoints(settings: &MissionSettings) -> Vec<Waypoint> {
        (0..3)
            .map(|i| {
                let mut w = Waypoint::from_settings(
                    GeoPoint::new(-117.8265 + i as f64 * 1e-4, 33.6846),
                    settings,
                );
                w.heading_deg = 90.0;
                w
            })
            .collect()
    }

    fn boundary() -> BoundaryPolygon {
        BoundaryPolygon::new(vec![
            GeoPoint::new(-117.827, 33.684),
            GeoPoint::new(-117.826, 33.684),
            GeoPoint::new(-117.826, 33.685),
        ])
    }

    #[test]
    fn geojson_round_trip_restores_session() {
        let settings = MissionSettings {
            altitude_m: 72.5,
            end_of_mission: EndOfMission::AutoLand,
            ..MissionSettings::default()
        };
        let mission = MissionFile::new(sample_waypoints(&settings), &settings, &boundary());
        let text = mission.to_geojson_string().unwrap();

        let outcome = MissionFile::from_geojson_str(&text, &MissionSettings::default()).unwrap();
        assert!(outcome.notice.is_none());
        assert_eq!(outcome.mission.waypoints, mission.waypoints);
        assert_eq!(outcome.mission.end_of_mission, EndOfMission::AutoLand);
        let session = outcome.session().unwrap();
        assert_eq!(session.settings, settings);
        assert_eq!(session.boundary, boundary());
    }

    #[test]
    fn bare_feature_collection_uses_defaults() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [8.0, 47.0]},
                 "properties": {"altitude_m": 30.0}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[8.0, 47.0], [8.1, 47.0]]},
                 "properties": {}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [8.001, 47.0]},
                 "properties": null}
            ]
        }"#;
        let defaults = MissionSettings::default();
        let outcome = MissionFile::from_geojson_str(text, &defaults).unwrap();
        assert!(matches!(outcome.notice, Some(MissionError::PartialRestore(_))));
        let waypoints = &outcome.mission.waypoints;
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0].altitude_m, 30.0);
        assert_eq!(waypoints[1].altitude_m, defaults.altitude_m);
        assert_eq!(waypoints[1].camera_action, defaults.camera_action);
        assert_ne!(waypoints[0].id, waypoints[1].id);
    }

    #[test]
    fn malformed_session_member_is_a_soft_notice() {
        let settings = MissionSettings::default();
        let mission = MissionFile::new(sample_waypoints(&settings), &settings, &boundary());
        let mut collection = mission.to_feature_collection().unwrap();
        collection
            .foreign_members
            .as_mut()
            .unwrap()
            .insert(SESSION_SETTINGS_KEY.to_string(), JsonValue::from("garbage"));
        let text = serde_json::to_string(&collection).unwrap();

        let outcome = MissionFile::from_geojson_str(&text, &settings).unwrap();
        assert!(matches!(outcome.notice, Some(MissionError::PartialRestore(_))));
        assert_eq!(outcome.mission.waypoints.len(), 3);
        assert!(outcome.session().is_none());
    }

    #[test]
    fn invalid_json_is_a_decode_failure() {
        let err = MissionFile::from_geojson_str("{\"type\":", &MissionSettings::default())
            .unwrap_err();
        assert!(matches!(err, MissionError::DecodeFailure { .. }));
    }

    #[test]
    fn boundary_from_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}, "properties": {}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "Polygon",
                 "coordinates": [[[0.0, 0.0], [0.001, 0.0], [0.001, 0.001], [0.0, 0.001]]]}}
            ]
        }"#;
        let boundary = BoundaryPolygon::from_geojson(text).unwrap();
        assert_eq!(boundary.ring().len(), 5);
        assert!(boundary.validate().is_ok());

        let geometry = boundary.to_geojson_geometry();
        let again = BoundaryPolygon::from_geojson(&geometry.to_string()).unwrap();
        assert_eq!(again, boundary);
    }

    #[test]
    fn boundary_requires_a_polygon() {
        let text = r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#;
        assert!(matches!(
            BoundaryPolygon::from_geojson(text),
            Err(MissionError::InvalidGeometry(_))
        ));
    }
}
