//! Per-work options.
//!
//! Everything a submission can customize: scheduling priority, OS thread
//! priority hint, timeout override, prerequisites, custom id, group label,
//! the long-running marker and the retry policy.

use super::config::TimeoutPolicy;
use super::work::WorkId;
use std::collections::HashSet;
use std::time::Duration;

/// OS scheduling hint for the thread executing a work.
///
/// Applied per work, best effort. On Linux this maps to the thread's nice
/// level; elsewhere the hint is recorded but not applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThreadPriority {
    Lowest,
    BelowNormal,
    #[default]
    Normal,
    AboveNormal,
    Highest,
}

impl ThreadPriority {
    /// Nice value for this hint (positive is nicer, i.e. lower priority).
    #[cfg(target_os = "linux")]
    pub(crate) fn nice_value(self) -> i32 {
        match self {
            Self::Lowest => 19,
            Self::BelowNormal => 10,
            Self::Normal => 0,
            Self::AboveNormal => -5,
            Self::Highest => -10,
        }
    }
}

/// Whether a failed work is rerun in place or resubmitted to the dispatcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Rerun on the same worker immediately after the backoff sleep.
    #[default]
    Immediate,
    /// Resubmit through the dispatcher; the work may land on another worker.
    Requeue,
}

/// Retry policy for failed works.
///
/// Only a `Failed` outcome is retried; stopped and cancelled works are not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,

    pub strategy: RetryStrategy,

    /// Backoff slept before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, strategy: RetryStrategy) -> Self {
        Self {
            max_retries,
            strategy,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Options attached to a single submission.
#[derive(Clone, Debug, Default)]
pub struct WorkOptions {
    /// Scheduling priority; larger runs first. Defaults to 0.
    pub priority: i32,

    /// OS thread priority hint for the executing worker.
    pub thread_priority: ThreadPriority,

    /// Per-work timeout, overriding the pool default.
    pub timeout: Option<TimeoutPolicy>,

    /// Ids this work waits on. The work dispatches only once every listed id
    /// has reached a terminal state.
    pub dependencies: HashSet<WorkId>,

    /// Caller-chosen id. Must be unique within the pool.
    pub custom_id: Option<String>,

    /// Group label for bulk operations.
    pub group: Option<String>,

    /// Marks the work as long-running: its worker is excluded from
    /// least-loaded balancing and the worker cap is extended past it.
    pub long_running: bool,

    /// Retry policy for `Failed` outcomes.
    pub retry: Option<RetryPolicy>,
}

impl WorkOptions {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_custom_id(mut self, id: impl Into<String>) -> Self {
        self.custom_id = Some(id.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_timeout(mut self, timeout: TimeoutPolicy) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_dependencies<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<WorkId>,
    {
        self.dependencies = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn long_running(mut self) -> Self {
        self.long_running = true;
        self
    }
}
