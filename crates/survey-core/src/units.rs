//! Display units for distances and speeds.

use serde::{Deserialize, Serialize};

const FEET_PER_METER: f64 = 3.280_84;
const MPH_PER_MPS: f64 = 2.236_936;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Convert meters to this system's length unit.
    pub fn length(self, meters: f64) -> f64 {
        match self {
            UnitSystem::Metric => meters,
            UnitSystem::Imperial => meters * FEET_PER_METER,
        }
    }

    pub fn speed(self, mps: f64) -> f64 {
        match self {
            UnitSystem::Metric => mps,
            UnitSystem::Imperial => mps * MPH_PER_MPS,
        }
    }

    pub fn length_suffix(self) -> &'static str {
        match self {
            UnitSystem::Metric => "m",
            UnitSystem::Imperial => "ft",
        }
    }

    pub fn speed_suffix(self) -> &'static str {
        match self {
            UnitSystem::Metric => "m/s",
            UnitSystem::Imperial => "mph",
        }
    }

    /// Format a distance, switching to km / mi past 1000 m.
    pub fn format_distance(self, meters: f64) -> String {
        match self {
            UnitSystem::Metric if meters >= 1000.0 => format!("{:.2} km", meters / 1000.0),
            UnitSystem::Imperial if meters >= 1609.344 => {
                format!("{:.2} mi", meters / 1609.344)
            }
            _ => format!("{:.0} {}", self.length(meters), self.length_suffix()),
        }
    }

    pub fn format_speed(self, mps: f64) -> String {
        format!("{:.1} {}", self.speed(mps), self.speed_suffix())
    }
}
