//! Work identity, lifecycle state and the per-submission record.
//!
//! A [`Work`] is the pool's internal record for one submission: the
//! re-invocable body, the optional callback, the options, the status machine
//! and the gates callers block on. The record is shared between the registry
//! and the executing worker, but only the owning worker mutates runtime
//! state after dispatch.

use super::error::WorkError;
use super::options::WorkOptions;
use super::sync::Gate;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Global counter for generated work ids.
static WORK_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

// =============================================================================
// Work Id
// =============================================================================

/// Unique identifier for a submitted work.
///
/// Ids are strings: either caller-supplied via `WorkOptions::custom_id` or
/// generated as `work-{counter}`.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct WorkId(String);

impl WorkId {
    /// Creates a work id with the given string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a generated `work-{counter}` id.
    pub fn auto() -> Self {
        let counter = WORK_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("work-{}", counter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkId({})", self.0)
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Work Status
// =============================================================================

/// Lifecycle state of a work.
///
/// Transitions are monotone except that `Running -> Waiting` is legal when a
/// work is requeued by its retry policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkStatus {
    /// Registered but not yet picked up by a worker.
    #[default]
    Waiting,

    /// Body currently executing.
    Running,

    /// Body returned a value.
    Succeeded,

    /// Body returned an error, panicked, or was interrupted by a forced stop.
    Failed,

    /// Ended at a cooperation point after a stop request.
    Stopped,

    /// Removed before the body ever started.
    Cancelled,
}

impl WorkStatus {
    /// Returns true for states a work never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Stopped | Self::Cancelled
        )
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Waiting,
            1 => Self::Running,
            2 => Self::Succeeded,
            3 => Self::Failed,
            4 => Self::Stopped,
            _ => Self::Cancelled,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Running => 1,
            Self::Succeeded => 2,
            Self::Failed => 3,
            Self::Stopped => 4,
            Self::Cancelled => 5,
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "Waiting",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Stopped => "Stopped",
            Self::Cancelled => "Cancelled",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Body, Value and Callback Types
// =============================================================================

/// Type-erased value produced by a work body.
///
/// Shared between the callback and every `WorkEnded` subscriber; recover the
/// concrete type with [`ExecuteResult::get`].
pub type WorkValue = Arc<dyn Any + Send + Sync>;

/// Erased, re-invocable work body. Re-invocation happens on retry.
pub(crate) type BodyFn =
    Box<dyn FnMut(&super::context::WorkContext) -> Result<WorkValue, WorkError> + Send>;

/// Per-work callback, invoked exactly once when the work reaches a terminal
/// state.
pub type Callback = Box<dyn FnOnce(ExecuteResult) + Send>;

/// Pool-level default callback, shared by every work submitted without one.
pub type SharedCallback = Arc<dyn Fn(ExecuteResult) + Send + Sync>;

// =============================================================================
// Execute Result
// =============================================================================

/// Outcome of a work, delivered to the callback and the `WorkEnded` event.
#[derive(Clone)]
pub struct ExecuteResult {
    /// Id of the work this outcome belongs to.
    pub id: WorkId,

    /// Terminal status.
    pub status: WorkStatus,

    /// Value produced on success.
    pub value: Option<WorkValue>,

    /// Error captured on failure, stop or cancellation.
    pub error: Option<WorkError>,

    /// Time spent waiting between submission and body start.
    pub queue_time: Duration,

    /// Time spent executing, excluding paused intervals.
    pub execute_time: Duration,
}

impl ExecuteResult {
    /// Downcasts the produced value to its concrete type.
    pub fn get<R: 'static>(&self) -> Option<&R> {
        self.value.as_ref()?.downcast_ref()
    }

    pub fn is_success(&self) -> bool {
        self.status == WorkStatus::Succeeded
    }
}

impl fmt::Debug for ExecuteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteResult")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("has_value", &self.value.is_some())
            .field("error", &self.error)
            .field("queue_time", &self.queue_time)
            .field("execute_time", &self.execute_time)
            .finish()
    }
}

// =============================================================================
// Work Record
// =============================================================================

/// Internal record for one submission.
pub(crate) struct Work {
    pub id: WorkId,

    /// The user body; taken under lock by the owning worker only.
    pub body: Mutex<Option<BodyFn>>,

    /// Per-work callback, consumed on the terminal transition.
    pub callback: Mutex<Option<Callback>>,

    pub options: WorkOptions,

    status: AtomicU8,

    /// When the work was (last) handed to a worker's collection.
    pub queued_at: Mutex<Instant>,

    pub started_at: Mutex<Option<Instant>>,

    /// Body invocations consumed, including retries.
    pub execute_count: AtomicU32,

    /// Cooperative stop request, observed at cooperation points.
    should_stop: AtomicBool,

    /// Per-work pause request; the executing body parks on `pause_gate`.
    is_pausing: AtomicBool,

    /// Set by a forced stop: the outcome has already been reported and the
    /// detached worker must discard whatever the body eventually returns.
    abandoned: AtomicBool,

    /// Guard ensuring the terminal bookkeeping runs exactly once even when a
    /// forced stop races normal completion.
    finalized: AtomicBool,

    /// Released on the terminal transition; `wait_for` blocks here.
    pub wait_gate: Gate,

    /// Closed while the work is paused by id.
    pub pause_gate: Gate,

    /// Prerequisites not yet terminal. Empty means dispatchable.
    pub remaining_deps: Mutex<HashSet<WorkId>>,

    /// Total time the body spent parked on pause gates; excluded from the
    /// execute time and added onto the work's deadline.
    pub paused_total: Mutex<Duration>,
}

impl Work {
    pub fn new(id: WorkId, body: BodyFn, options: WorkOptions, callback: Option<Callback>) -> Self {
        let remaining_deps = options.dependencies.clone();
        Self {
            id,
            body: Mutex::new(Some(body)),
            callback: Mutex::new(callback),
            options,
            status: AtomicU8::new(WorkStatus::Waiting.as_u8()),
            queued_at: Mutex::new(Instant::now()),
            started_at: Mutex::new(None),
            execute_count: AtomicU32::new(0),
            should_stop: AtomicBool::new(false),
            is_pausing: AtomicBool::new(false),
            abandoned: AtomicBool::new(false),
            finalized: AtomicBool::new(false),
            wait_gate: Gate::new(false),
            pause_gate: Gate::new(true),
            remaining_deps: Mutex::new(remaining_deps),
            paused_total: Mutex::new(Duration::ZERO),
        }
    }

    pub fn status(&self) -> WorkStatus {
        WorkStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: WorkStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
    }

    /// Atomically moves the work between states; fails if another thread got
    /// there first (e.g. cancel racing dispatch).
    pub fn transition(&self, from: WorkStatus, to: WorkStatus) -> bool {
        self.status
            .compare_exchange(
                from.as_u8(),
                to.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub fn request_stop(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }

    pub fn request_pause(&self) {
        self.is_pausing.store(true, Ordering::SeqCst);
        self.pause_gate.close();
    }

    /// Clears a pause request. No-op on a work that is not pausing.
    pub fn clear_pause(&self) -> bool {
        let was_pausing = self.is_pausing.swap(false, Ordering::SeqCst);
        self.pause_gate.open();
        was_pausing
    }

    pub fn is_pausing(&self) -> bool {
        self.is_pausing.load(Ordering::SeqCst)
    }

    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Claims the right to run the terminal bookkeeping for this work.
    pub fn try_finalize(&self) -> bool {
        !self.finalized.swap(true, Ordering::SeqCst)
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Work")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("execute_count", &self.execute_count.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
