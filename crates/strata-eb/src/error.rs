//! Error type for embedded-boundary construction.

use strata_core::RunError;
use thiserror::Error;

/// Failures while configuring or building the embedded boundary.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EbError {
    /// `eb2.geom_type` names a geometry with no implementation.
    #[error("unknown EB geometry type '{name}'")]
    UnknownGeometry {
        /// The configured name.
        name: String,
    },
    /// A geometry parameter is out of range.
    #[error("invalid EB parameter {field}: {reason}")]
    InvalidParameter {
        /// Parameter name, e.g. `"sphere_radius"`.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// The index space was requested for more levels than configured.
    #[error("required level {required} exceeds max level {max}")]
    LevelRange {
        /// Level the index space must reach.
        required: usize,
        /// Deepest level configured.
        max: usize,
    },
}

impl From<EbError> for RunError {
    fn from(e: EbError) -> Self {
        match e {
            EbError::UnknownGeometry { name } => RunError::Unsupported {
                feature: format!("EB geometry type '{name}'"),
            },
            other => RunError::usage(other.to_string()),
        }
    }
}
