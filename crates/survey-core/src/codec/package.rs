//! Mission package: a WPML-style KML document with an embedded session block.
//!
//! Layout:
//!
//! ```text
//! kml/Document
//!   wpml:createTime, wpml:updateTime        epoch milliseconds
//!   wpml:missionConfig                      finish and lost-link behavior
//!   Folder/Placemark*                       one per waypoint, in order
//!   wpml:sessionData encoding="base64"      JSON {settings, boundary}
//! ```
//!
//! Peer tools write the same layout without `sessionData`; those files import
//! as waypoints only.

use super::mission_file::{ImportOutcome, MissionFile, SessionBlock};
use crate::error::{CodecCause, MissionError};
use crate::models::{
    new_waypoint_id, BoundaryPolygon, CameraAction, EndOfMission, GeoPoint, LostLinkAction,
    MissionSettings, Waypoint,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const KML_NS: &str = "http://www.opengis.net/kml/2.2";
const WPML_NS: &str = "http://www.dji.com/wpmz/1.0.2";

/// Serialize a mission into a package document.
///
/// `created_at` is kept when present; `updated_at` is always stamped now.
pub fn encode_package(mission: &MissionFile) -> Result<String, MissionError> {
    let now = Utc::now();
    let created = mission.created_at.unwrap_or(now);

    let session = match (&mission.session_settings, &mission.session_boundary) {
        (Some(settings), Some(boundary)) => {
            let block = SessionBlock {
                settings: settings.clone(),
                boundary: boundary.clone(),
            };
            let json = serde_json::to_vec(&block)
                .map_err(|e| MissionError::encode("session block", e))?;
            Some(STANDARD.encode(json))
        }
        _ => None,
    };

    let mut out = PackageWriter::new();
    write_document(&mut out, mission, created, now, session.as_deref())
        .map_err(|e| MissionError::encode("package XML", e))?;
    let xml = String::from_utf8(out.finish()).map_err(|e| {
        MissionError::encode("package XML", CodecCause::Malformed(e.to_string()))
    })?;

    tracing::debug!(
        waypoints = mission.waypoints.len(),
        with_session = session.is_some(),
        "encoded mission package"
    );
    Ok(xml)
}

/// Package the output of a planning run together with its editing state.
pub fn export_mission(
    waypoints: &[Waypoint],
    settings: &MissionSettings,
    boundary: &BoundaryPolygon,
) -> Result<String, MissionError> {
    encode_package(&MissionFile::new(waypoints.to_vec(), settings, boundary))
}

/// Import a package from raw file bytes.
pub fn decode_package_bytes(
    bytes: &[u8],
    defaults: &MissionSettings,
) -> Result<ImportOutcome, MissionError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let xml = std::str::from_utf8(bytes).map_err(|e| {
        MissionError::decode("package", CodecCause::Malformed(format!("not UTF-8: {e}")))
    })?;
    decode_package(xml, defaults)
}

/// Import a package document.
///
/// Corrupt XML or unreadable waypoint records fail the import. A missing or
/// unreadable session block yields the waypoints plus a `PartialRestore`
/// notice.
pub fn decode_package(xml: &str, defaults: &MissionSettings) -> Result<ImportOutcome, MissionError> {
    let parsed = parse_document(xml, defaults)?;

    let mut mission = MissionFile::waypoints_only(parsed.waypoints, defaults);
    mission.created_at = parsed.created_at;
    mission.updated_at = parsed.updated_at;
    if let Some(end) = parsed.end_of_mission {
        mission.end_of_mission = end;
    }
    if let Some(lost) = parsed.lost_link_action {
        mission.lost_link_action = lost;
    }

    let notice = match parsed.session_data.as_deref().map(decode_session) {
        Some(Ok(block)) => {
            mission.session_settings = Some(block.settings);
            mission.session_boundary = Some(block.boundary);
            None
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "session block unreadable, importing waypoints only");
            Some(MissionError::PartialRestore(format!(
                "session block is malformed: {e}"
            )))
        }
        None => {
            tracing::warn!("package has no session block, importing waypoints only");
            Some(MissionError::PartialRestore(
                "package has no session block".to_string(),
            ))
        }
    };

    tracing::debug!(
        waypoints = mission.waypoints.len(),
        restored = notice.is_none(),
        "decoded mission package"
    );
    Ok(ImportOutcome { mission, notice })
}

fn decode_session(encoded: &str) -> Result<SessionBlock, CodecCause> {
    let compact: String = encoded.split_whitespace().collect();
    let json = STANDARD.decode(compact.as_bytes())?;
    let block: SessionBlock = serde_json::from_slice(&json)?;
    block
        .boundary
        .validate()
        .map_err(|e| CodecCause::Malformed(e.to_string()))?;
    Ok(block)
}

// ==== Writing ====

struct PackageWriter {
    inner: Writer<Vec<u8>>,
}

impl PackageWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn start(&mut self, element: BytesStart<'_>) -> quick_xml::Result<()> {
        self.inner.write_event(Event::Start(element))
    }

    fn open(&mut self, name: &str) -> quick_xml::Result<()> {
        self.start(BytesStart::new(name))
    }

    fn close(&mut self, name: &str) -> quick_xml::Result<()> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))
    }

    fn leaf(&mut self, name: &str, text: &str) -> quick_xml::Result<()> {
        self.open(name)?;
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

fn write_document(
    out: &mut PackageWriter,
    mission: &MissionFile,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    session: Option<&str>,
) -> quick_xml::Result<()> {
    out.inner
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.start(
        BytesStart::new("kml").with_attributes([("xmlns", KML_NS), ("xmlns:wpml", WPML_NS)]),
    )?;
    out.open("Document")?;
    out.leaf("wpml:createTime", &created.timestamp_millis().to_string())?;
    out.leaf("wpml:updateTime", &updated.timestamp_millis().to_string())?;

    out.open("wpml:missionConfig")?;
    out.leaf("wpml:flyToWaylineMode", "safely")?;
    out.leaf("wpml:finishAction", finish_action_tag(mission.end_of_mission))?;
    let (exit_on_lost, lost_action) = lost_link_tags(mission.lost_link_action);
    out.leaf("wpml:exitOnRCLost", exit_on_lost)?;
    if let Some(action) = lost_action {
        out.leaf("wpml:executeRCLostAction", action)?;
    }
    out.close("wpml:missionConfig")?;

    out.open("Folder")?;
    for (index, waypoint) in mission.waypoints.iter().enumerate() {
        write_placemark(out, index, waypoint)?;
    }
    out.close("Folder")?;

    if let Some(encoded) = session {
        out.start(BytesStart::new("wpml:sessionData").with_attributes([("encoding", "base64")]))?;
        out.inner.write_event(Event::Text(BytesText::new(encoded)))?;
        out.close("wpml:sessionData")?;
    }

    out.close("Document")?;
    out.close("kml")
}

fn write_placemark(
    out: &mut PackageWriter,
    index: usize,
    waypoint: &Waypoint,
) -> quick_xml::Result<()> {
    out.open("Placemark")?;
    out.open("Point")?;
    out.leaf(
        "coordinates",
        &format!("{},{}", waypoint.position.lon, waypoint.position.lat),
    )?;
    out.close("Point")?;
    out.leaf("wpml:index", &index.to_string())?;
    out.leaf("wpml:waypointId", &waypoint.id)?;
    out.leaf("wpml:executeHeight", &waypoint.altitude_m.to_string())?;
    out.leaf("wpml:waypointSpeed", &waypoint.speed_mps.to_string())?;
    out.leaf("wpml:gimbalPitchAngle", &waypoint.gimbal_pitch_deg.to_string())?;
    out.leaf("wpml:waypointHeadingAngle", &waypoint.heading_deg.to_string())?;
    out.leaf("wpml:actionType", action_tag(waypoint.camera_action))?;
    out.close("Placemark")
}

fn finish_action_tag(action: EndOfMission) -> &'static str {
    match action {
        EndOfMission::GoHome => "goHome",
        EndOfMission::AutoLand => "autoLand",
        EndOfMission::GotoFirstWaypoint => "gotoFirstWaypoint",
        EndOfMission::Hover => "hover",
    }
}

fn parse_finish_action(tag: &str) -> Option<EndOfMission> {
    match tag {
        "goHome" => Some(EndOfMission::GoHome),
        "autoLand" => Some(EndOfMission::AutoLand),
        "gotoFirstWaypoint" => Some(EndOfMission::GotoFirstWaypoint),
        "hover" | "noAction" => Some(EndOfMission::Hover),
        _ => None,
    }
}

/// `exitOnRCLost` value plus the `executeRCLostAction` it implies.
fn lost_link_tags(action: LostLinkAction) -> (&'static str, Option<&'static str>) {
    match action {
        LostLinkAction::Continue => ("goContinue", None),
        LostLinkAction::GoBack => ("executeLostAction", Some("goBack")),
        LostLinkAction::Hover => ("executeLostAction", Some("hover")),
        LostLinkAction::Land => ("executeLostAction", Some("landing")),
    }
}

fn parse_lost_action(tag: &str) -> Option<LostLinkAction> {
    match tag {
        "goBack" => Some(LostLinkAction::GoBack),
        "hover" => Some(LostLinkAction::Hover),
        "landing" => Some(LostLinkAction::Land),
        _ => None,
    }
}

fn action_tag(action: CameraAction) -> &'static str {
    match action {
        CameraAction::None => "none",
        CameraAction::Photo => "takePhoto",
        CameraAction::StartStopRecording => "toggleRecord",
    }
}

fn parse_action(tag: &str) -> Option<CameraAction> {
    match tag {
        "none" => Some(CameraAction::None),
        "takePhoto" => Some(CameraAction::Photo),
        "toggleRecord" | "startRecord" | "stopRecord" => Some(CameraAction::StartStopRecording),
        _ => None,
    }
}

// ==== Reading ====

#[derive(Default)]
struct ParsedDocument {
    waypoints: Vec<Waypoint>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    end_of_mission: Option<EndOfMission>,
    exit_on_lost: Option<String>,
    lost_link_action: Option<LostLinkAction>,
    session_data: Option<String>,
}

/// Fields of one `Placemark`; absent values fall back to the import defaults.
#[derive(Default)]
struct PlacemarkFields {
    position: Option<GeoPoint>,
    id: Option<String>,
    altitude_m: Option<f64>,
    speed_mps: Option<f64>,
    gimbal_pitch_deg: Option<f64>,
    heading_deg: Option<f64>,
    camera_action: Option<CameraAction>,
}

impl PlacemarkFields {
    fn into_waypoint(
        self,
        ordinal: usize,
        defaults: &MissionSettings,
    ) -> Result<Waypoint, MissionError> {
        let position = self.position.ok_or_else(|| {
            malformed(format!("placemark {ordinal} has no coordinates"))
        })?;
        Ok(Waypoint {
            id: self.id.unwrap_or_else(new_waypoint_id),
            position,
            altitude_m: self.altitude_m.unwrap_or(defaults.altitude_m),
            speed_mps: self.speed_mps.unwrap_or(defaults.speed_mps),
            gimbal_pitch_deg: self.gimbal_pitch_deg.unwrap_or(defaults.gimbal_pitch_deg),
            heading_deg: self.heading_deg.unwrap_or(0.0),
            camera_action: self.camera_action.unwrap_or(defaults.camera_action),
        })
    }
}

fn malformed(message: String) -> MissionError {
    MissionError::decode("package", CodecCause::Malformed(message))
}

fn parse_number(element: &str, text: &str) -> Result<f64, MissionError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(format!("<{element}> is not a number: {text:?}")))
}

fn parse_millis(element: &str, text: &str) -> Result<DateTime<Utc>, MissionError> {
    text.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| malformed(format!("<{element}> is not a timestamp: {text:?}")))
}

fn parse_coordinates(text: &str) -> Result<GeoPoint, MissionError> {
    let mut parts = text.trim().split(',').map(str::trim);
    let lon = parts.next().unwrap_or_default();
    let lat = parts.next().unwrap_or_default();
    let point = GeoPoint::new(parse_number("coordinates", lon)?, parse_number("coordinates", lat)?);
    Ok(point)
}

/// Walk the document keeping a stack of open element names. Placemarks are
/// finalized against `defaults` as they close so record errors carry their
/// ordinal.
fn parse_document(xml: &str, defaults: &MissionSettings) -> Result<ParsedDocument, MissionError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut doc = ParsedDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut placemark: Option<PlacemarkFields> = None;
    let mut seen_root = false;
    let mut placemarks = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| MissionError::decode("package XML", e))?;
        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                if stack.is_empty() {
                    if name != "kml" {
                        return Err(malformed(format!("root element is <{name}>, expected <kml>")));
                    }
                    seen_root = true;
                }
                if name == "Placemark" {
                    placemark = Some(PlacemarkFields::default());
                }
                stack.push(name);
            }
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    if name == "Placemark" {
                        if let Some(fields) = placemark.take() {
                            doc.waypoints.push(fields.into_waypoint(placemarks, defaults)?);
                            placemarks += 1;
                        }
                    }
                }
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| MissionError::decode("package XML", e))?;
                apply_text(&mut doc, placemark.as_mut(), &stack, &value)?;
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                apply_text(&mut doc, placemark.as_mut(), &stack, &value)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(malformed("document has no <kml> root element".to_string()));
    }
    if let Some(open) = stack.last() {
        return Err(malformed(format!("document ends inside <{open}>")));
    }

    if doc.exit_on_lost.as_deref() == Some("goContinue") {
        doc.lost_link_action = Some(LostLinkAction::Continue);
    }
    Ok(doc)
}

fn apply_text(
    doc: &mut ParsedDocument,
    placemark: Option<&mut PlacemarkFields>,
    stack: &[String],
    value: &str,
) -> Result<(), MissionError> {
    let Some(element) = stack.last().map(String::as_str) else {
        return Ok(());
    };

    if let Some(fields) = placemark {
        match element {
            "coordinates" => fields.position = Some(parse_coordinates(value)?),
            "waypointId" => fields.id = Some(value.trim().to_string()),
            "executeHeight" => fields.altitude_m = Some(parse_number(element, value)?),
            "waypointSpeed" => fields.speed_mps = Some(parse_number(element, value)?),
            "gimbalPitchAngle" => fields.gimbal_pitch_deg = Some(parse_number(element, value)?),
            "waypointHeadingAngle" => fields.heading_deg = Some(parse_number(element, value)?),
            "actionType" => {
                fields.camera_action = parse_action(value.trim());
                if fields.camera_action.is_none() {
                    tracing::debug!(action = value, "unknown waypoint action, using default");
                }
            }
            _ => {}
        }
        return Ok(());
    }

    match element {
        "createTime" => doc.created_at = Some(parse_millis(element, value)?),
        "updateTime" => doc.updated_at = Some(parse_millis(element, value)?),
        "finishAction" => doc.end_of_mission = parse_finish_action(value.trim()),
        "exitOnRCLost" => doc.exit_on_lost = Some(value.trim().to_string()),
        "executeRCLostAction" => doc.lost_link_action = parse_lost_action(value.trim()),
        "sessionData" => doc.session_data = Some(value.to_string()),
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> BoundaryPolygon {
        BoundaryPolygon::new(vec![
            GeoPoint::new(-117.827, 33.684),
            GeoPoint::new(-117.826, 33.684),
            GeoPoint::new(-117.826, 33.685),
            GeoPoint::new(-117.827, 33.685),
        ])
    }

    fn waypoints(settings: &MissionSettings) -> Vec<Waypoint> {
        [(-117.8268, 33.6843), (-117.8262, 33.6843), (-117.8262, 33.6847)]
            .iter()
            .enumerate()
            .map(|(i, (lon, lat))| {
                let mut w = Waypoint::from_settings(GeoPoint::new(*lon, *lat), settings);
                w.heading_deg = 90.0 * i as f64;
                w
            })
            .collect()
    }

    const PEER_PACKAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2" xmlns:wpml="http://www.dji.com/wpmz/1.0.2">
  <Document>
    <wpml:missionConfig>
      <wpml:finishAction>autoLand</wpml:finishAction>
      <wpml:exitOnRCLost>goContinue</wpml:exitOnRCLost>
    </wpml:missionConfig>
    <Folder>
      <Placemark>
        <Point><coordinates>8.5417,47.3769</coordinates></Point>
        <wpml:executeHeight>35</wpml:executeHeight>
      </Placemark>
      <Placemark>
        <Point><coordinates> 8.5420 , 47.3770 </coordinates></Point>
        <wpml:actionType>toggleRecord</wpml:actionType>
      </Placemark>
    </Folder>
  </Document>
</kml>"#;

    #[test]
    fn encoded_document_has_expected_layout() {
        let settings = MissionSettings::default();
        let xml = export_mission(&waypoints(&settings), &settings, &boundary()).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(xml.matches("<Placemark>").count(), 3);
        assert!(xml.contains("<wpml:finishAction>goHome</wpml:finishAction>"));
        assert!(xml.contains("<wpml:executeRCLostAction>goBack</wpml:executeRCLostAction>"));
        assert!(xml.contains("<wpml:actionType>takePhoto</wpml:actionType>"));
        assert!(xml.contains(r#"<wpml:sessionData encoding="base64">"#));
    }

    #[test]
    fn package_round_trip_restores_everything() {
        let settings = MissionSettings {
            altitude_m: 65.0,
            side_overlap_pct: 75.0,
            lost_link_action: LostLinkAction::Land,
            end_of_mission: EndOfMission::GotoFirstWaypoint,
            ..MissionSettings::default()
        };
        let original = waypoints(&settings);
        let xml = export_mission(&original, &settings, &boundary()).unwrap();

        let outcome = decode_package(&xml, &MissionSettings::default()).unwrap();
        assert!(outcome.notice.is_none());
        assert_eq!(outcome.mission.waypoints, original);
        assert_eq!(outcome.mission.lost_link_action, LostLinkAction::Land);
        assert_eq!(
            outcome.mission.end_of_mission,
            EndOfMission::GotoFirstWaypoint
        );
        assert!(outcome.mission.created_at.is_some());
        let session = outcome.session().unwrap();
        assert_eq!(session.settings, settings);
        assert_eq!(session.boundary, boundary());
    }

    #[test]
    fn created_at_survives_re_export() {
        let settings = MissionSettings::default();
        let created = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
        let mut mission = MissionFile::new(waypoints(&settings), &settings, &boundary());
        mission.created_at = Some(created);

        let xml = encode_package(&mission).unwrap();
        let outcome = decode_package(&xml, &settings).unwrap();
        assert_eq!(outcome.mission.created_at, Some(created));
        assert!(outcome.mission.updated_at.unwrap() >= created);
    }

    #[test]
    fn peer_package_imports_waypoints_only() {
        let defaults = MissionSettings::default();
        let outcome = decode_package(PEER_PACKAGE, &defaults).unwrap();
        assert!(matches!(outcome.notice, Some(MissionError::PartialRestore(_))));
        assert!(outcome.session().is_none());

        let wps = &outcome.mission.waypoints;
        assert_eq!(wps.len(), 2);
        assert_eq!(wps[0].position, GeoPoint::new(8.5417, 47.3769));
        assert_eq!(wps[0].altitude_m, 35.0);
        assert_eq!(wps[0].camera_action, defaults.camera_action);
        assert_eq!(wps[1].altitude_m, defaults.altitude_m);
        assert_eq!(wps[1].speed_mps, defaults.speed_mps);
        assert_eq!(wps[1].camera_action, CameraAction::StartStopRecording);
        assert_ne!(wps[0].id, wps[1].id);
        assert_eq!(outcome.mission.end_of_mission, EndOfMission::AutoLand);
        assert_eq!(outcome.mission.lost_link_action, LostLinkAction::Continue);
    }

    #[test]
    fn wrong_root_is_a_decode_failure() {
        let err = decode_package("<gpx><trk/></gpx>", &MissionSettings::default()).unwrap_err();
        assert!(matches!(err, MissionError::DecodeFailure { .. }));
        let err = decode_package("not xml at all", &MissionSettings::default()).unwrap_err();
        assert!(matches!(err, MissionError::DecodeFailure { .. }));
    }

    #[test]
    fn bad_number_is_a_decode_failure() {
        let xml = PEER_PACKAGE.replace("<wpml:executeHeight>35", "<wpml:executeHeight>tall");
        let err = decode_package(&xml, &MissionSettings::default()).unwrap_err();
        assert!(err.to_string().contains("package"));
        assert!(matches!(err, MissionError::DecodeFailure { .. }));
    }

    #[test]
    fn unclosed_document_is_a_decode_failure() {
        let cut = &PEER_PACKAGE[..PEER_PACKAGE.find("</Folder>").unwrap()];
        let err = decode_package(cut, &MissionSettings::default()).unwrap_err();
        assert!(matches!(err, MissionError::DecodeFailure { .. }));
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(PEER_PACKAGE.as_bytes());
        let outcome = decode_package_bytes(&bytes, &MissionSettings::default()).unwrap();
        assert_eq!(outcome.mission.waypoints.len(), 2);

        let err = decode_package_bytes(&[0xff, 0xfe, 0x00], &MissionSettings::default())
            .unwrap_err();
        assert!(matches!(err, MissionError::DecodeFailure { .. }));
    }
}
