//! Survey CLI - Command line tools for survey mission planning.
//!
//! Binaries:
//! - plan_survey: boundary + settings to a mission package
//! - inspect_mission: import a package and report its metrics

pub mod config;
pub mod summary;

pub use config::Config;
pub use summary::{format_metrics, format_notice};
