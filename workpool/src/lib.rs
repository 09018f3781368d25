//! workpool - an in-process work pool over reusable executor threads.
//!
//! This library dispatches user-submitted units of computation ("works")
//! across a bounded set of OS threads, honoring priorities, inter-work
//! dependencies, per-work and pool-wide timeouts, cooperative pause/resume,
//! graceful and forced cancellation, retries and grouping.
//!
//! # Quick start
//!
//! ```ignore
//! use workpool::{PoolConfig, WorkPool};
//!
//! let pool = WorkPool::new(PoolConfig::with_max_threads(8));
//!
//! let id = pool.submit(|| heavy_computation())?;
//!
//! pool.wait(); // block until the pool goes idle
//! ```
//!
//! The [`pool`] module documents the architecture; the commonly used types
//! are re-exported at the crate root.

pub mod pool;

pub use pool::{
    Callback, DependencyRelease, DestroyThreadOption, ErrorSource, EventSink, ExecuteResult,
    NullEventSink, PoolConfig, PoolError, PoolEvent, QueueOrder, RetryPolicy, RetryStrategy,
    SharedCallback, StopRequested, ThreadPriority, TimeoutPolicy, TracingEventSink, WorkContext,
    WorkError, WorkGroup, WorkId, WorkOptions, WorkPool, WorkStatus, WorkValue,
};

/// Version of the workpool library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
