//! Survey mission planning: footprints, grid and orbit paths, flight metrics,
//! and mission package import/export.

pub mod codec;
pub mod error;
pub mod footprint;
pub mod metrics;
pub mod models;
pub mod path_engine;
pub mod profiles;
pub mod rules;
pub mod spatial;
pub mod units;

pub use codec::{
    decode_package, decode_package_bytes, encode_package, export_mission, ImportOutcome,
    MissionFile, SessionBlock,
};
pub use error::{CodecCause, MissionError};
pub use footprint::{calculate_footprint, footprint_for_waypoint, Footprint};
pub use metrics::{
    evaluate_mission, forward_overlap_distance, max_safe_speed, max_safe_speed_with_overlap,
    minimum_leg_distance, mission_time_s, total_distance, warning_level, FlightMetrics,
    WarningLevel,
};
pub use models::{
    BoundaryPolygon, CameraAction, EndOfMission, GeoPoint, LostLinkAction, MissionSettings,
    OrbitDirection, PathType, Waypoint,
};
pub use path_engine::{synthesize_path, PathStats, PathSynthesisResult};
pub use profiles::{all_profiles, find_profile, resolve_camera, CameraParams, DroneProfile};
pub use rules::PlannerRules;
pub use spatial::{bearing, destination, haversine_distance};
pub use units::UnitSystem;
