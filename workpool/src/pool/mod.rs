//! Work Pool Framework
//!
//! This module provides a thread-pool based execution framework for
//! user-submitted works with priorities, dependencies, timeouts and
//! cooperative pause/stop control.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         WorkPool                             │
//! │  Submit works, wait, signal, observe state                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        Dispatcher                            │
//! │  Worker acquisition, dependency gating, idle sweep          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Workers     │  │ Deadline    │  │ Event               │  │
//! │  │ (1 thread   │  │ Watchdog    │  │ Sinks               │  │
//! │  │  each)      │  │             │  │                     │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Work**: a unit of computation with identity, options and a lifecycle
//!   {Waiting, Running, Succeeded, Failed, Stopped, Cancelled}.
//!
//! - **Worker**: a reusable executor owning one OS thread, draining a
//!   private priority collection. The dispatcher reuses idle workers, grows
//!   up to `max_threads` (extended by long-running works) and balances onto
//!   the least-loaded worker under saturation.
//!
//! - **Cooperation points**: bodies receive a [`WorkContext`] whose
//!   `pause_if_requested` / `stop_if_requested` / `check_if_stop_requested`
//!   make pause and stop effective; forced stops dispose the worker instead.
//!
//! - **Dependencies**: a submission naming prerequisite ids dispatches only
//!   after every one of them reached a terminal state.
//!
//! # Example
//!
//! ```ignore
//! use workpool::{PoolConfig, WorkOptions, WorkPool};
//!
//! let pool = WorkPool::new(PoolConfig::default());
//!
//! let id = pool.submit_with_callback(
//!     || expensive_computation(),
//!     WorkOptions::default().with_priority(5),
//!     |result| println!("{} ended: {}", result.id, result.status),
//! )?;
//!
//! pool.wait();
//! ```
//!
//! # Events
//!
//! The pool emits [`PoolEvent`]s through registered [`EventSink`]s: pool
//! lifecycle (started, idle, timeout), work lifecycle (started, ended,
//! timeout, stopped) and contained subscriber/callback errors.

mod config;
mod context;
mod core;
mod dependency;
mod dispatch;
mod error;
mod events;
mod group;
mod lifecycle;
mod options;
mod queue;
mod signals;
mod stats;
mod sync;
mod watchdog;
mod work;
mod worker;

// Configuration
pub use config::{
    default_max_threads, DependencyRelease, DestroyThreadOption, PoolConfig, TimeoutPolicy,
    DEFAULT_KEEP_ALIVE, DEFAULT_MAX_THREADS_MULTIPLIER,
};

// Options
pub use options::{RetryPolicy, RetryStrategy, ThreadPriority, WorkOptions};

// Errors
pub use error::{PoolError, StopRequested, WorkError};

// Work types
pub use work::{Callback, ExecuteResult, SharedCallback, WorkId, WorkStatus, WorkValue};

// Context
pub use context::WorkContext;

// Queue ordering
pub use queue::QueueOrder;

// Events
pub use events::{ErrorSource, EventSink, NullEventSink, PoolEvent, TracingEventSink};

// Pool and group facade
pub use core::WorkPool;
pub use group::WorkGroup;
