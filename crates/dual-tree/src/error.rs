//! The error type shared by tree construction and the traversals.

use thiserror::Error;

/// Errors that can occur while building a tree or running a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A caller-supplied argument is out of its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A closed-form computation produced `NaN`, an infinity or a negative
    /// discriminant.
    ///
    /// The traversals never surface this variant; they recover by falling
    /// back to a safe default (no pruning, or sampling the full set).
    #[error("numerically degenerate computation: {0}")]
    NumericDegenerate(String),

    /// The requested combination of bound, metric and kernel is not
    /// supported.
    #[error("unimplemented: {0}")]
    Unimplemented(String),
}

impl TreeError {
    /// Shorthand for building an `InvalidArgument` error.
    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Results returned throughout the crate.
pub type Result<T> = core::result::Result<T, TreeError>;
