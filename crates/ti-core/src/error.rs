//! Index error types.

use thiserror::Error;

/// Boxed error returned by a visitor callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while inserting into or querying an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A nearest-time query was made against an empty index.
    #[error("not found")]
    NotFound,

    /// An interval's start was not strictly before its end.
    #[error("interval is invalid: start must be before end")]
    InvalidInterval,

    /// A visitor callback failed and the scan was stopped.
    ///
    /// The visitor's own error is kept unchanged as the source.
    #[error("visitor aborted the scan: {0}")]
    CallbackAborted(#[source] BoxError),
}

impl IndexError {
    /// Wraps a visitor failure.
    pub(crate) fn aborted(err: impl Into<BoxError>) -> Self {
        Self::CallbackAborted(err.into())
    }
}

/// Result type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
