//! Human-readable mission reports.

use std::fmt::Write as _;
use survey_core::{FlightMetrics, MissionError, UnitSystem, WarningLevel};

fn warning_label(level: WarningLevel) -> &'static str {
    match level {
        WarningLevel::Safe => "OK",
        WarningLevel::Warning => "WARNING: close to battery limit",
        WarningLevel::Critical => "CRITICAL: exceeds battery limit",
    }
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}m {:02}s", total / 60, total % 60)
}

/// Multi-line metrics report in the given unit system.
pub fn format_metrics(metrics: &FlightMetrics, units: UnitSystem) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Waypoints:        {}", metrics.waypoint_count);
    let _ = writeln!(
        out,
        "Total distance:   {}",
        units.format_distance(metrics.total_distance_m)
    );
    let _ = writeln!(
        out,
        "Shortest leg:     {}",
        units.format_distance(metrics.min_leg_distance_m)
    );
    let _ = writeln!(
        out,
        "Photo spacing:    {}",
        units.format_distance(metrics.forward_overlap_distance_m)
    );
    let _ = writeln!(
        out,
        "Max safe speed:   {}",
        units.format_speed(metrics.max_safe_speed_mps)
    );
    let _ = writeln!(
        out,
        "Flight speed:     {}",
        units.format_speed(metrics.effective_speed_mps)
    );
    let _ = writeln!(out, "Mission time:     {}", format_duration(metrics.mission_time_s));
    if metrics.max_flight_time_min > 0.0 {
        let _ = writeln!(
            out,
            "Battery limit:    {:.0} min",
            metrics.max_flight_time_min
        );
    } else {
        let _ = writeln!(out, "Battery limit:    none");
    }
    let _ = write!(out, "Status:           {}", warning_label(metrics.warning_level));
    out
}

/// One-line description of an import notice.
pub fn format_notice(notice: &MissionError) -> String {
    if notice.is_soft() {
        format!("note: {notice}; settings and boundary were not restored")
    } else {
        format!("error: {notice}")
    }
}
