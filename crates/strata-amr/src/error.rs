//! Error type for the level hierarchy.

use strata_comm::CommError;
use strata_core::{RunError, StateTypeId};
use strata_grid::GridError;
use strata_plotfile::PlotfileError;
use thiserror::Error;

/// Failures while building, advancing, or restarting the hierarchy.
#[derive(Debug, Error)]
pub enum AmrError {
    /// An `amr.*` parameter is invalid.
    #[error("invalid amr.{field}: {reason}")]
    Config {
        /// Parameter name without the `amr.` prefix.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// A level's physics reported a failure.
    #[error("level {level}: {reason}")]
    Level {
        /// Level index.
        level: usize,
        /// Description of the failure.
        reason: String,
    },
    /// A derived quantity was requested that no level registers.
    #[error("unknown derived quantity '{name}'")]
    UnknownDerive {
        /// Requested name.
        name: String,
    },
    /// A state type was requested that a level does not carry.
    #[error("level {level} has no state type {ty}")]
    UnknownStateType {
        /// Level index.
        level: usize,
        /// Requested type.
        ty: StateTypeId,
    },
    /// A checkpoint could not be used to restart.
    #[error("cannot restart from '{path}': {reason}")]
    Restart {
        /// Checkpoint directory.
        path: String,
        /// What was wrong.
        reason: String,
    },
    /// The time step collapsed to zero or became non-finite.
    #[error("time step {dt} at step {step} is not usable")]
    TimeStep {
        /// Offending time step.
        dt: f64,
        /// Coarse step at which it was computed.
        step: i64,
    },
    /// A scheduled output event failed.
    #[error(transparent)]
    Output(#[from] RunError),
    /// A field container operation failed.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// A collective operation failed.
    #[error(transparent)]
    Comm(#[from] CommError),
    /// Reading checkpoint data failed.
    #[error(transparent)]
    Plotfile(#[from] PlotfileError),
}

impl AmrError {
    /// Shorthand for an [`AmrError::Level`].
    pub fn level(level: usize, reason: impl ToString) -> Self {
        Self::Level {
            level,
            reason: reason.to_string(),
        }
    }
}

impl From<AmrError> for RunError {
    fn from(e: AmrError) -> Self {
        match e {
            AmrError::Config { .. } => RunError::usage(e.to_string()),
            AmrError::Output(inner) => inner,
            AmrError::Grid(inner) => inner.into(),
            AmrError::Comm(inner) => inner.into(),
            AmrError::Plotfile(inner) => inner.into(),
            other => RunError::collaborator("level hierarchy", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_failures_pass_through_unchanged() {
        let io = RunError::Io {
            path: "plt00001/Header".into(),
            reason: "denied".into(),
        };
        assert_eq!(RunError::from(AmrError::Output(io.clone())), io);
    }

    #[test]
    fn config_errors_are_usage_errors() {
        let e = AmrError::Config {
            field: "n_cell",
            reason: "must be positive".into(),
        };
        assert!(matches!(RunError::from(e), RunError::Usage { .. }));
        let e = AmrError::level(1, "negative density");
        assert_eq!(
            RunError::from(e),
            RunError::collaborator("level hierarchy", "level 1: negative density")
        );
    }
}
