//! Error type for grid and field-container operations.

use strata_comm::CommError;
use strata_core::{IndexBox, RunError};
use thiserror::Error;

/// Failures of box-array, distribution, or field-container operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GridError {
    /// Two containers that must share a layout do not.
    #[error("layout mismatch: {detail}")]
    LayoutMismatch {
        /// Which part of the layout differs.
        detail: String,
    },
    /// A component range falls outside a container.
    #[error("components {start}..{end} out of range for {ncomp} components")]
    ComponentRange {
        /// First requested component.
        start: usize,
        /// One past the last requested component.
        end: usize,
        /// Components available.
        ncomp: usize,
    },
    /// A requested ghost width exceeds what a container carries.
    #[error("ghost width {requested} exceeds available {available}")]
    GhostWidth {
        /// Requested ghost width.
        requested: usize,
        /// Ghost width available.
        available: usize,
    },
    /// A box is empty or otherwise unusable.
    #[error("invalid box {bx}: {reason}")]
    InvalidBox {
        /// The offending box.
        bx: IndexBox,
        /// Why it was rejected.
        reason: String,
    },
    /// A distribution mapping does not match its box array.
    #[error("distribution covers {mapped} boxes but the box array has {boxes}")]
    DistributionSize {
        /// Boxes in the mapping.
        mapped: usize,
        /// Boxes in the box array.
        boxes: usize,
    },
    /// A serialized data block could not be decoded.
    #[error("malformed data block: {detail}")]
    MalformedBlock {
        /// Description of the problem.
        detail: String,
    },
    /// Data exchange between ranks failed.
    #[error("exchange failed: {0}")]
    Comm(#[from] CommError),
}

impl From<GridError> for RunError {
    fn from(e: GridError) -> Self {
        RunError::collaborator("field container", e)
    }
}
