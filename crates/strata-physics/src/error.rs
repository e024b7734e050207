//! Error type for physics configuration.

use strata_core::RunError;
use thiserror::Error;

/// An invalid `physics.*` parameter.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PhysicsError {
    /// A parameter is out of range.
    #[error("invalid physics.{field}: {reason}")]
    InvalidParameter {
        /// Parameter name without the `physics.` prefix.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<PhysicsError> for RunError {
    fn from(e: PhysicsError) -> Self {
        RunError::usage(e.to_string())
    }
}
