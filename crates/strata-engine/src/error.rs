//! Parameter errors.

use strata_core::RunError;
use thiserror::Error;

/// Failures reading or validating run parameters.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParamError {
    /// The inputs file could not be read.
    #[error("cannot read inputs file '{path}': {reason}")]
    File {
        /// Path of the inputs file.
        path: String,
        /// Underlying cause.
        reason: String,
    },
    /// The inputs file is not valid TOML.
    #[error("inputs file '{path}' is malformed: {reason}")]
    Syntax {
        /// Path of the inputs file.
        path: String,
        /// Parser message.
        reason: String,
    },
    /// An inline override could not be applied.
    #[error("bad override '{arg}': {reason}")]
    Override {
        /// The argument as given.
        arg: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A parameter has the wrong type.
    #[error("parameter '{key}' has the wrong type: {reason}")]
    Type {
        /// Dotted parameter name.
        key: String,
        /// Deserializer message.
        reason: String,
    },
    /// A parameter has an unacceptable value.
    #[error("invalid parameter '{key}': {reason}")]
    Invalid {
        /// Dotted parameter name.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ParamError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ParamError> for RunError {
    fn from(e: ParamError) -> Self {
        match e {
            ParamError::File { path, reason } => RunError::Io { path, reason },
            other => RunError::usage(other.to_string()),
        }
    }
}
