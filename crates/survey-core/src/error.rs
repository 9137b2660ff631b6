//! Error kinds shared by the planner and the mission codec.

use thiserror::Error;

/// Errors raised by survey planning and mission import/export.
///
/// `InvalidGeometry` and `InvalidConfiguration` never escape path synthesis;
/// they are reported as diagnostics next to an empty waypoint list.
/// `PartialRestore` is a soft notice attached to a successful import.
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to decode mission {context}")]
    DecodeFailure {
        context: String,
        #[source]
        source: CodecCause,
    },

    #[error("failed to encode mission {context}")]
    EncodeFailure {
        context: String,
        #[source]
        source: CodecCause,
    },

    #[error("session data not restored: {0}")]
    PartialRestore(String),
}

impl MissionError {
    pub(crate) fn decode(context: impl Into<String>, source: impl Into<CodecCause>) -> Self {
        Self::DecodeFailure {
            context: context.into(),
            source: source.into(),
        }
    }

    pub(crate) fn encode(context: impl Into<String>, source: impl Into<CodecCause>) -> Self {
        Self::EncodeFailure {
            context: context.into(),
            source: source.into(),
        }
    }

    /// True for errors that leave the caller with a usable result.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::PartialRestore(_))
    }
}

/// Underlying cause of a codec failure.
#[derive(Debug, Error)]
pub enum CodecCause {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    GeoJson(#[from] geojson::Error),

    #[error("{0}")]
    Malformed(String),
}
