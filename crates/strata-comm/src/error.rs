//! Error type for collective operations.

use strata_core::RunError;
use thiserror::Error;

/// Failures of a collective operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommError {
    /// A peer's channel closed before the collective completed.
    #[error("rank {peer} disconnected")]
    Disconnected {
        /// The rank that went away.
        peer: usize,
    },
    /// A group was requested with zero ranks.
    #[error("process group must have at least one rank")]
    EmptyGroup,
    /// A reduction payload had the wrong shape.
    #[error("malformed collective payload: {detail}")]
    MalformedPayload {
        /// Description of the problem.
        detail: String,
    },
}

impl From<CommError> for RunError {
    fn from(e: CommError) -> Self {
        RunError::collaborator("communicator", e)
    }
}
