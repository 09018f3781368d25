//! Pool configuration.
//!
//! [`PoolConfig`] gathers the pool-wide knobs: the worker cap, the
//! shrink-when-idle policy, the pool and default per-work timeouts, the
//! default callback and the suspended-start switch.
//!
//! Validation is deferred to pool initialization, which happens on the first
//! submission; an inconsistent configuration surfaces there as
//! [`PoolError::MinThreadsExceedsMax`].
//!
//! [`PoolError::MinThreadsExceedsMax`]: super::error::PoolError::MinThreadsExceedsMax

use super::queue::QueueOrder;
use super::work::SharedCallback;
use std::time::Duration;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Multiplier applied to the logical CPU count for the default worker cap.
pub const DEFAULT_MAX_THREADS_MULTIPLIER: usize = 2;

/// Default keep-alive for surplus idle workers when shrinking is enabled.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(3);

/// Returns the default worker cap: 2x the logical CPU count.
pub fn default_max_threads() -> usize {
    num_cpus::get() * DEFAULT_MAX_THREADS_MULTIPLIER
}

// =============================================================================
// Policy Types
// =============================================================================

/// A timeout with its enforcement mode.
///
/// Used for the pool-wide timeout, the pool default per-work timeout and the
/// per-work override. With `force_stop` the deadline abandons the running
/// body; without it the deadline only requests a cooperative stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub duration: Duration,
    pub force_stop: bool,
}

impl TimeoutPolicy {
    pub fn new(duration: Duration, force_stop: bool) -> Self {
        Self {
            duration,
            force_stop,
        }
    }
}

/// Shrink policy for idle workers.
///
/// When set, idle workers above `min_threads` retire after sitting idle for
/// `keep_alive`. Without it the pool never shrinks below its high-water mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestroyThreadOption {
    /// Workers the pool keeps alive even when idle.
    pub min_threads: usize,

    /// How long a surplus worker may sit idle before retiring.
    pub keep_alive: Duration,
}

impl Default for DestroyThreadOption {
    fn default() -> Self {
        Self {
            min_threads: num_cpus::get(),
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

/// When a prerequisite's terminal state releases its dependents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DependencyRelease {
    /// Any terminal state (including `Failed`) unblocks dependents.
    #[default]
    AnyTerminal,

    /// Only `Succeeded` unblocks; a failed, stopped or cancelled prerequisite
    /// cancels its dependents (and theirs, transitively).
    SucceededOnly,
}

// =============================================================================
// Pool Configuration
// =============================================================================

/// Configuration for a [`WorkPool`].
///
/// [`WorkPool`]: super::core::WorkPool
#[derive(Clone)]
pub struct PoolConfig {
    /// Upper bound on concurrently running workers. Long-running works
    /// extend this cap by their own count so they do not starve short tasks.
    pub max_threads: usize,

    /// Idle-worker shrink policy. `None` disables shrinking.
    pub destroy_thread: Option<DestroyThreadOption>,

    /// Pool-wide timeout, armed on each running transition.
    pub pool_timeout: Option<TimeoutPolicy>,

    /// Timeout applied to every work that does not carry its own.
    pub default_work_timeout: Option<TimeoutPolicy>,

    /// Callback invoked for works submitted without one.
    pub default_callback: Option<SharedCallback>,

    /// Hold submissions until [`WorkPool::start`] is called.
    ///
    /// [`WorkPool::start`]: super::core::WorkPool::start
    pub start_suspended: bool,

    /// Ordering among works that share a priority.
    pub queue_order: QueueOrder,

    /// Predicate deciding when terminal prerequisites release dependents.
    pub dependency_release: DependencyRelease,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_threads: default_max_threads(),
            destroy_thread: None,
            pool_timeout: None,
            default_work_timeout: None,
            default_callback: None,
            start_suspended: false,
            queue_order: QueueOrder::Fifo,
            dependency_release: DependencyRelease::AnyTerminal,
        }
    }
}

impl PoolConfig {
    /// Configuration with an explicit worker cap and defaults elsewhere.
    pub fn with_max_threads(max_threads: usize) -> Self {
        Self {
            max_threads,
            ..Self::default()
        }
    }

    /// The configured floor of alive workers (0 when shrinking is disabled).
    pub(crate) fn min_threads(&self) -> usize {
        self.destroy_thread.map(|d| d.min_threads).unwrap_or(0)
    }
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("max_threads", &self.max_threads)
            .field("destroy_thread", &self.destroy_thread)
            .field("pool_timeout", &self.pool_timeout)
            .field("default_work_timeout", &self.default_work_timeout)
            .field("has_default_callback", &self.default_callback.is_some())
            .field("start_suspended", &self.start_suspended)
            .field("queue_order", &self.queue_order)
            .field("dependency_release", &self.dependency_release)
            .finish()
    }
}
