//! Mission import/export.

pub mod mission_file;
pub mod package;

pub use mission_file::{ImportOutcome, MissionFile, SessionBlock};
pub use package::{decode_package, decode_package_bytes, encode_package, export_mission};
