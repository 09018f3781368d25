//! Pool observability events.
//!
//! The pool emits structured events via a sink abstraction: the dispatcher
//! does not know how events are consumed. Register sinks with
//! [`WorkPool::add_event_sink`]; every registered sink sees every event.
//!
//! Sink invocations are guarded: a panicking subscriber is reported through
//! [`PoolEvent::Error`] and never unwinds into the pool.
//!
//! [`WorkPool::add_event_sink`]: super::core::WorkPool::add_event_sink

use super::work::{ExecuteResult, WorkId};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

// =============================================================================
// Events
// =============================================================================

/// Where a reported error originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorSource {
    /// A registered event sink panicked.
    EventSink,
    /// A work callback panicked.
    Callback,
    /// Pool bookkeeping.
    Pool,
}

/// Events emitted during pool and work execution.
#[derive(Clone, Debug)]
pub enum PoolEvent {
    /// The pool left the not-running state: the first work of a new epoch
    /// was accepted.
    PoolStarted,

    /// The idle sweep found no running workers and no waiting works.
    PoolIdle,

    /// The pool-wide deadline elapsed.
    PoolTimeout,

    /// A work's body is about to run.
    WorkStarted { id: WorkId },

    /// A work reached a terminal state through execution.
    WorkEnded { result: ExecuteResult },

    /// A work's deadline elapsed.
    WorkTimeout { id: WorkId },

    /// A work ended via the stop protocol.
    WorkStopped { id: WorkId, forced: bool },

    /// A subscriber or bookkeeping failure. Never propagated.
    Error {
        source: ErrorSource,
        message: String,
    },
}

impl PoolEvent {
    /// Short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PoolStarted => "pool_started",
            Self::PoolIdle => "pool_idle",
            Self::PoolTimeout => "pool_timeout",
            Self::WorkStarted { .. } => "work_started",
            Self::WorkEnded { .. } => "work_ended",
            Self::WorkTimeout { .. } => "work_timeout",
            Self::WorkStopped { .. } => "work_stopped",
            Self::Error { .. } => "error",
        }
    }

    /// The work id associated with this event, if any.
    pub fn work_id(&self) -> Option<&WorkId> {
        match self {
            Self::WorkStarted { id } | Self::WorkTimeout { id } | Self::WorkStopped { id, .. } => {
                Some(id)
            }
            Self::WorkEnded { result } => Some(&result.id),
            _ => None,
        }
    }
}

// =============================================================================
// Event Sink Trait
// =============================================================================

/// Receiver for pool events.
///
/// Implementations must be `Send + Sync`; events are delivered from worker
/// threads, the watchdog thread and the submitting thread. `on_event` should
/// be fast and non-blocking.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &PoolEvent);
}

/// No-op sink for when observation is not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn on_event(&self, _event: &PoolEvent) {}
}

/// Sink that logs events via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn on_event(&self, event: &PoolEvent) {
        match event {
            PoolEvent::PoolStarted => {
                tracing::debug!("Pool started");
            }
            PoolEvent::PoolIdle => {
                tracing::debug!("Pool idle");
            }
            PoolEvent::PoolTimeout => {
                tracing::warn!("Pool timeout elapsed");
            }
            PoolEvent::WorkStarted { id } => {
                tracing::debug!(work_id = %id, "Work started");
            }
            PoolEvent::WorkEnded { result } => {
                tracing::debug!(
                    work_id = %result.id,
                    status = %result.status,
                    queue_ms = result.queue_time.as_millis() as u64,
                    execute_ms = result.execute_time.as_millis() as u64,
                    "Work ended"
                );
            }
            PoolEvent::WorkTimeout { id } => {
                tracing::warn!(work_id = %id, "Work timeout elapsed");
            }
            PoolEvent::WorkStopped { id, forced } => {
                tracing::warn!(work_id = %id, forced = forced, "Work stopped");
            }
            PoolEvent::Error { source, message } => {
                tracing::error!(source = ?source, message = %message, "Pool error");
            }
        }
    }
}

// =============================================================================
// Sink Registry
// =============================================================================

/// Registered sinks with guarded fan-out.
#[derive(Default)]
pub(crate) struct SinkRegistry {
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl SinkRegistry {
    pub fn add(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Delivers an event to every sink. A panicking sink is reported through
    /// an `Error` event to the remaining sinks; a panic while delivering an
    /// `Error` event is only logged, so reporting cannot recurse.
    pub fn emit(&self, event: PoolEvent) {
        let sinks = self.sinks.read().clone();
        for (index, sink) in sinks.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| sink.on_event(&event)));
            if outcome.is_err() {
                tracing::error!(
                    event = event.event_type(),
                    sink_index = index,
                    "Event sink panicked"
                );
                if !matches!(event, PoolEvent::Error { .. }) {
                    let report = PoolEvent::Error {
                        source: ErrorSource::EventSink,
                        message: format!("event sink panicked during `{}`", event.event_type()),
                    };
                    for other in &sinks {
                        let _ = catch_unwind(AssertUnwindSafe(|| other.on_event(&report)));
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("sink_count", &self.sinks.read().len())
            .finish()
    }
}
