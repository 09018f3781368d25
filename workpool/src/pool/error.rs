//! Error types for the pool and for individual works.
//!
//! [`PoolError`] covers submission-time and lifecycle failures of the pool
//! itself. [`WorkError`] describes why a single work ended unsuccessfully and
//! travels to the callback and the `WorkEnded` event.

use thiserror::Error;

/// Errors returned by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The worker pool configuration is inconsistent.
    #[error("The minimum number of threads cannot be greater than the maximum number of threads.")]
    MinThreadsExceedsMax,

    /// The pool is stopping and no longer accepts submissions.
    ///
    /// A stopping pool becomes accepting again once the idle sweep has
    /// returned it to the not-running state.
    #[error("pool is stopping; new works are not accepted")]
    Stopping,

    /// The pool has been disposed.
    #[error("pool has been disposed")]
    Disposed,

    /// A work with the same custom id is already registered.
    #[error("a work with id `{0}` is already registered")]
    DuplicateWorkId(String),
}

/// Why a work did not end in `Succeeded`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkError {
    /// The work observed a stop request at a cooperation point.
    #[error("work was stopped")]
    Stopped,

    /// The work was cancelled before its body started.
    #[error("work was cancelled before it started")]
    Cancelled,

    /// The work was abandoned by a forced stop while running.
    #[error("work was interrupted by a forced stop")]
    Interrupted,

    /// The work body panicked.
    #[error("work body panicked: {0}")]
    Panicked(String),

    /// The work body returned an error.
    #[error("{0}")]
    Failed(String),
}

impl WorkError {
    /// Wraps an arbitrary error message as a body failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Marker error returned by [`WorkContext::stop_if_requested`].
///
/// Converts into [`WorkError::Stopped`] with `?`, so a cooperating body can
/// exit a deep call chain in one line. The worker boundary reports the
/// resulting outcome as status `Stopped`, never as a failure.
///
/// [`WorkContext::stop_if_requested`]: super::context::WorkContext::stop_if_requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopRequested;

impl std::fmt::Display for StopRequested {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stop requested")
    }
}

impl std::error::Error for StopRequested {}

impl From<StopRequested> for WorkError {
    fn from(_: StopRequested) -> Self {
        WorkError::Stopped
    }
}
