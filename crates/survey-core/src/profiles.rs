//! Built-in drone/camera presets.

use crate::models::MissionSettings;
use serde::Serialize;

/// Sentinel id whose camera parameters come from the mission settings.
pub const CUSTOM_PROFILE_ID: &str = "custom";

/// Static hardware preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DroneProfile {
    pub id: &'static str,
    pub display_name: &'static str,
    pub horizontal_fov_deg: f64,
    /// Minutes of flight per battery; 0 = unlimited
    pub max_flight_time_min: f64,
    /// Minimum seconds between two photos
    pub photo_cadence_s: f64,
}

static PROFILES: &[DroneProfile] = &[
    DroneProfile {
        id: "dji_mini_4_pro",
        display_name: "DJI Mini 4 Pro",
        horizontal_fov_deg: 82.1,
        max_flight_time_min: 34.0,
        photo_cadence_s: 2.0,
    },
    DroneProfile {
        id: "dji_mini_3",
        display_name: "DJI Mini 3",
        horizontal_fov_deg: 82.1,
        max_flight_time_min: 38.0,
        photo_cadence_s: 2.0,
    },
    DroneProfile {
        id: "dji_air_3",
        display_name: "DJI Air 3",
        horizontal_fov_deg: 82.0,
        max_flight_time_min: 46.0,
        photo_cadence_s: 2.0,
    },
    DroneProfile {
        id: "dji_mavic_3_enterprise",
        display_name: "DJI Mavic 3 Enterprise",
        horizontal_fov_deg: 72.0,
        max_flight_time_min: 45.0,
        photo_cadence_s: 0.7,
    },
    DroneProfile {
        id: "dji_phantom_4_rtk",
        display_name: "DJI Phantom 4 RTK",
        horizontal_fov_deg: 73.7,
        max_flight_time_min: 30.0,
        photo_cadence_s: 2.5,
    },
    DroneProfile {
        id: "dji_matrice_350_p1",
        display_name: "DJI Matrice 350 RTK + P1",
        horizontal_fov_deg: 63.5,
        max_flight_time_min: 55.0,
        photo_cadence_s: 0.7,
    },
    DroneProfile {
        id: "tethered",
        display_name: "Tethered platform",
        horizontal_fov_deg: 84.0,
        max_flight_time_min: 0.0,
        photo_cadence_s: 1.0,
    },
];

/// Every registered preset, in display order.
pub fn all_profiles() -> &'static [DroneProfile] {
    PROFILES
}

/// Look up a preset by id. `"custom"` and unknown ids return `None`.
pub fn find_profile(id: &str) -> Option<&'static DroneProfile> {
    PROFILES.iter().find(|profile| profile.id == id)
}

/// Camera parameters in effect for a mission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraParams {
    pub horizontal_fov_deg: f64,
    pub photo_cadence_s: f64,
    pub max_flight_time_min: f64,
    /// False when the settings' custom values were used
    pub from_registry: bool,
}

/// Resolve the profile named in `settings`.
///
/// Unknown ids fall back to the custom FOV/cadence from the settings, with no
/// flight-time limit.
pub fn resolve_camera(settings: &MissionSettings) -> CameraParams {
    match find_profile(&settings.drone_profile_id) {
        Some(profile) => CameraParams {
            horizontal_fov_deg: profile.horizontal_fov_deg,
            photo_cadence_s: profile.photo_cadence_s,
            max_flight_time_min: profile.max_flight_time_min,
            from_registry: true,
        },
        None => {
            if settings.drone_profile_id != CUSTOM_PROFILE_ID {
                tracing::debug!(
                    profile_id = %settings.drone_profile_id,
                    "unknown drone profile, using custom camera parameters"
                );
            }
            CameraParams {
                horizontal_fov_deg: settings.custom_hfov_deg,
                photo_cadence_s: settings.custom_photo_cadence_s,
                max_flight_time_min: 0.0,
                from_registry: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_ids_are_unique() {
        let profiles = all_profiles();
        for (i, a) in profiles.iter().enumerate() {
            assert!(a.id != CUSTOM_PROFILE_ID);
            assert!(profiles[i + 1..].iter().all(|b| b.id != a.id), "{}", a.id);
        }
    }

    #[test]
    fn registered_profile_overrides_custom_values() {
        let settings = MissionSettings {
            drone_profile_id: "dji_phantom_4_rtk".into(),
            custom_hfov_deg: 10.0,
            ..MissionSettings::default()
        };
        let camera = resolve_camera(&settings);
        assert!(camera.from_registry);
        assert_eq!(camera.horizontal_fov_deg, 73.7);
        assert_eq!(camera.max_flight_time_min, 30.0);
    }

    #[test]
    fn unknown_profile_behaves_like_custom() {
        let settings = MissionSettings {
            drone_profile_id: "prototype-x".into(),
            custom_hfov_deg: 60.0,
            custom_photo_cadence_s: 3.0,
            ..MissionSettings::default()
        };
        let camera = resolve_camera(&settings);
        let custom = resolve_camera(&MissionSettings {
            drone_profile_id: CUSTOM_PROFILE_ID.into(),
            ..settings.clone()
        });
        assert_eq!(camera, custom);
        assert_eq!(camera.horizontal_fov_deg, 60.0);
        assert_eq!(camera.photo_cadence_s, 3.0);
        assert_eq!(camera.max_flight_time_min, 0.0);
    }
}
