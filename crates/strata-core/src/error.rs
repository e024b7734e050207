//! Run-level error taxonomy.
//!
//! Every failure the driver can meet is run-ending. Subsystem errors
//! (grid, communicator, writer, hierarchy, parameters) convert into exactly
//! one [`RunError`] category, which decides the diagnostic printed before
//! the process group terminates.

use thiserror::Error;

/// A fatal condition that ends the run.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RunError {
    /// Bad invocation or unsatisfiable parameters. Raised before any
    /// output is attempted.
    #[error("{reason}")]
    Usage {
        /// What was wrong with the invocation.
        reason: String,
    },
    /// A file the run depends on could not be created, opened, or written.
    #[error("I/O failure on '{path}': {reason}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying cause.
        reason: String,
    },
    /// An external collaborator (hierarchy, solver, communicator, writer)
    /// reported a failure.
    #[error("{component} failed: {reason}")]
    Collaborator {
        /// Which collaborator failed.
        component: String,
        /// Description of the failure.
        reason: String,
    },
    /// A requested feature exists in configuration but has no implementation.
    #[error("not implemented: {feature}")]
    Unsupported {
        /// The requested feature.
        feature: String,
    },
}

impl RunError {
    /// Shorthand for a [`RunError::Usage`].
    pub fn usage(reason: impl Into<String>) -> Self {
        Self::Usage {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`RunError::Collaborator`].
    pub fn collaborator(component: impl Into<String>, reason: impl ToString) -> Self {
        Self::Collaborator {
            component: component.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status reported for this error. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } => 2,
            Self::Io { .. } => 3,
            Self::Collaborator { .. } => 4,
            Self::Unsupported { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_nonzero_and_distinct() {
        let errs = [
            RunError::usage("x"),
            RunError::Io {
                path: "p".into(),
                reason: "r".into(),
            },
            RunError::collaborator("amr", "boom"),
            RunError::Unsupported {
                feature: "hdf5".into(),
            },
        ];
        let mut codes: Vec<i32> = errs.iter().map(RunError::exit_code).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.dedup();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn display_names_the_collaborator() {
        let err = RunError::collaborator("level advance", "dt collapsed");
        assert_eq!(err.to_string(), "level advance failed: dt collapsed");
    }
}
