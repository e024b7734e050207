//! Error type for dataset writing and reading.

use strata_comm::CommError;
use strata_core::RunError;
use strata_grid::GridError;
use thiserror::Error;

/// Failures of the dataset writer or reader.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PlotfileError {
    /// The coordinator could not create or open a shared metadata file.
    #[error("cannot open metadata file '{path}': {reason}")]
    MetadataOpen {
        /// File being opened.
        path: String,
        /// Underlying cause.
        reason: String,
    },
    /// Reading or writing a data file failed.
    #[error("I/O error on '{path}': {reason}")]
    Io {
        /// File being accessed.
        path: String,
        /// Underlying cause.
        reason: String,
    },
    /// A requested encoding has no implementation.
    #[error("{feature} not implemented yet")]
    NotImplemented {
        /// The requested encoding.
        feature: String,
    },
    /// A file on disk does not have the expected structure.
    #[error("malformed '{path}': {detail}")]
    Malformed {
        /// File being parsed.
        path: String,
        /// What was wrong.
        detail: String,
    },
    /// The write request is internally inconsistent.
    #[error("inconsistent write request: {detail}")]
    Request {
        /// What was inconsistent.
        detail: String,
    },
    /// Another rank failed during a collective write.
    #[error("rank {rank} failed: {reason}")]
    Remote {
        /// Rank reporting the failure.
        rank: usize,
        /// Its diagnostic.
        reason: String,
    },
    /// Exchange between ranks failed.
    #[error("exchange failed: {0}")]
    Comm(#[from] CommError),
    /// A field container operation failed.
    #[error("field container: {0}")]
    Grid(#[from] GridError),
}

impl PlotfileError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, e: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn malformed(path: impl AsRef<std::path::Path>, detail: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.as_ref().display().to_string(),
            detail: detail.into(),
        }
    }
}

impl From<PlotfileError> for RunError {
    fn from(e: PlotfileError) -> Self {
        match e {
            PlotfileError::MetadataOpen { path, reason } | PlotfileError::Io { path, reason } => {
                RunError::Io { path, reason }
            }
            PlotfileError::NotImplemented { feature } => RunError::Unsupported { feature },
            other => RunError::collaborator("dataset writer", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_run_errors() {
        let open = PlotfileError::MetadataOpen {
            path: "plt00000/Header".into(),
            reason: "denied".into(),
        };
        assert!(matches!(RunError::from(open), RunError::Io { .. }));
        let hdf5 = PlotfileError::NotImplemented {
            feature: "HDF5 plotfile".into(),
        };
        assert_eq!(
            RunError::from(hdf5),
            RunError::Unsupported {
                feature: "HDF5 plotfile".into()
            }
        );
        let remote = PlotfileError::Remote {
            rank: 2,
            reason: "disk full".into(),
        };
        assert!(matches!(RunError::from(remote), RunError::Collaborator { .. }));
    }
}
