//! Error types for the transformation pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum McError {
    /// Malformed problem input.
    #[error("{file}:{line}: {msg}")]
    Parse {
        file: String,
        line: usize,
        msg: String,
    },

    /// A numeric group selector did not name a variable or constraint group.
    #[error("group selector {0} is out of range")]
    GroupOutOfRange(usize),

    /// A counterexample named a variable outside the current scope.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// A pipeline stage was invoked before its predecessor produced output.
    #[error("stage `{stage}` requires the {missing} problem")]
    StagePrecondition {
        stage: &'static str,
        missing: &'static str,
    },

    /// Projection derived `0 >= c` with `c > 0` (or `0 = c` with `c != 0`).
    #[error("projection derived an infeasible constraint")]
    InfeasibleProjection,

    /// An external tool exited non-zero or produced no output.
    #[error("{tool} failed: {reason}")]
    External { tool: String, reason: String },

    /// The specification group encoded to an empty CNF.
    #[error("specification CNF is empty")]
    EmptySpec,

    /// A required file could not be created or read.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl McError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        McError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for pipeline operations
pub type McResult<T> = Result<T, McError>;
