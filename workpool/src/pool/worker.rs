//! Worker: a reusable executor owning one OS thread.
//!
//! Each worker drains a private priority collection of work ids. The
//! dispatcher claims a worker (CAS on the claim flag), pushes a work into its
//! collection and signals its run channel; the worker thread loops between
//! blocking on that channel and draining the collection.
//!
//! Workers hold only a weak reference to the pool, so dropping the pool lets
//! every thread unwind; the pool strongly owns the workers.
//!
//! All worker-state accounting is guarded by CAS transitions on the state
//! machine {Idle, Running, ToBeDisposed}: whichever thread wins a transition
//! performs the counter updates for it, so a forced disposal racing a normal
//! drain can never double-count.

use super::context::WorkContext;
use super::core::PoolInner;
use super::error::WorkError;
use super::options::{RetryStrategy, ThreadPriority};
use super::queue::{PriorityCollection, QueueOrder};
use super::watchdog::DeadlineKey;
use super::work::{Work, WorkId, WorkStatus, WorkValue};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, trace, warn};

pub(crate) type WorkerId = usize;

/// Worker lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WorkerState {
    Idle = 0,
    Running = 1,
    ToBeDisposed = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::ToBeDisposed,
        }
    }
}

/// Signal delivered to a worker's run channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WorkerSignal {
    /// Work has been pushed into the private collection.
    Run,
    /// Exit the thread at the next boundary.
    Kill,
}

/// Shared worker state. The owning thread runs [`worker_loop`].
pub(crate) struct Worker {
    pub id: WorkerId,

    state: AtomicU8,

    /// Claim flag taken by a dispatcher while it hands this worker a work,
    /// and by the worker itself while retiring.
    claim: AtomicBool,

    long_running: AtomicBool,

    kill: AtomicBool,

    /// Private collection of pending work ids.
    pub queue: PriorityCollection<WorkId>,

    /// Id of the work whose body is currently executing.
    pub current_work: Mutex<Option<WorkId>>,

    signal_tx: Sender<WorkerSignal>,
}

impl Worker {
    pub fn new(id: WorkerId, order: QueueOrder, signal_tx: Sender<WorkerSignal>) -> Self {
        Self {
            id,
            state: AtomicU8::new(WorkerState::Idle as u8),
            claim: AtomicBool::new(false),
            long_running: AtomicBool::new(false),
            kill: AtomicBool::new(false),
            queue: PriorityCollection::new(order),
            current_work: Mutex::new(None),
            signal_tx,
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn try_transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn try_claim(&self) -> bool {
        self.claim
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn release_claim(&self) {
        self.claim.store(false, Ordering::SeqCst);
    }

    /// Marks this worker long-running; returns false if it already was.
    pub fn mark_long_running(&self) -> bool {
        !self.long_running.swap(true, Ordering::SeqCst)
    }

    /// Clears the long-running mark; returns true if it was set.
    pub fn clear_long_running(&self) -> bool {
        self.long_running.swap(false, Ordering::SeqCst)
    }

    pub fn is_long_running(&self) -> bool {
        self.long_running.load(Ordering::SeqCst)
    }

    pub fn set_kill(&self) {
        self.kill.store(true, Ordering::SeqCst);
    }

    pub fn killed(&self) -> bool {
        self.kill.load(Ordering::SeqCst)
    }

    pub fn signal(&self, signal: WorkerSignal) {
        let _ = self.signal_tx.send(signal);
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("pending", &self.queue.len())
            .field("long_running", &self.is_long_running())
            .finish()
    }
}

// =============================================================================
// Worker Thread Loop
// =============================================================================

/// Body outcome as classified at the worker boundary.
pub(crate) enum Outcome {
    Succeeded(WorkValue),
    Failed(WorkError),
    Stopped,
}

/// Main loop of a worker thread.
pub(crate) fn worker_loop(
    worker: Arc<Worker>,
    pool: Weak<PoolInner>,
    signals: Receiver<WorkerSignal>,
) {
    debug!(worker_id = worker.id, "Worker thread started");

    loop {
        let keep_alive = match pool.upgrade() {
            Some(pool) => pool.config.destroy_thread.map(|d| d.keep_alive),
            None => return,
        };

        let signal = match keep_alive {
            Some(timeout) => match signals.recv_timeout(timeout) {
                Ok(signal) => signal,
                Err(RecvTimeoutError::Timeout) => {
                    let Some(pool) = pool.upgrade() else { return };
                    if pool.try_retire(&worker) {
                        debug!(worker_id = worker.id, "Worker retired after keep-alive");
                        return;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match signals.recv() {
                Ok(signal) => signal,
                Err(_) => return,
            },
        };

        if signal == WorkerSignal::Kill || worker.killed() {
            return;
        }

        let Some(pool) = pool.upgrade() else { return };

        // Drain the private collection.
        loop {
            if worker.killed() {
                return;
            }
            let Some(work_id) = worker.queue.get() else {
                break;
            };

            match worker.state() {
                WorkerState::Idle => {
                    if worker.try_transition(WorkerState::Idle, WorkerState::Running) {
                        pool.on_worker_running();
                    } else {
                        return;
                    }
                }
                WorkerState::Running => {}
                WorkerState::ToBeDisposed => return,
            }

            // Cancelled works are removed from the registry and skipped here.
            let Some(work) = pool.setted_works.get(&work_id).map(|e| Arc::clone(e.value()))
            else {
                continue;
            };
            execute_work(&pool, &worker, work);
        }

        if worker.try_transition(WorkerState::Running, WorkerState::Idle) {
            pool.on_worker_idle(&worker);
        } else if worker.state() == WorkerState::ToBeDisposed {
            return;
        }
        // Still idle after a spurious wakeup: fall through to the next recv.
    }
}

/// Runs one work to its terminal outcome, honoring immediate retries.
fn execute_work(pool: &PoolInner, worker: &Arc<Worker>, work: Arc<Work>) {
    let token = pool.cancel_token();

    // Pool cancellation that arrived before the body: the work never starts.
    if token.is_cancelled() || work.stop_requested() {
        pool.finalize_cancelled(&work);
        return;
    }

    if !work.transition(WorkStatus::Waiting, WorkStatus::Running) {
        return; // cancelled in the dispatch window
    }
    pool.on_work_started(&work, worker);

    apply_thread_priority(work.options.thread_priority);

    let deadline = work
        .options
        .timeout
        .or(pool.config.default_work_timeout);
    if let Some(policy) = deadline {
        pool.watchdog
            .arm(DeadlineKey::Work(work.id.clone()), policy.duration);
    }

    let ctx = WorkContext::new(Arc::clone(&work), pool.weak_handle());
    let started = Instant::now();

    let outcome = loop {
        // A forced stop may land between dispatch and the body invocation.
        if work.is_abandoned() {
            break Outcome::Failed(WorkError::Interrupted);
        }
        work.execute_count.fetch_add(1, Ordering::SeqCst);

        let Some(mut body) = work.body.lock().take() else {
            break Outcome::Failed(WorkError::failed("work body missing"));
        };
        let result = catch_unwind(AssertUnwindSafe(|| body(&ctx)));
        *work.body.lock() = Some(body);

        let outcome = match result {
            Ok(Ok(value)) => Outcome::Succeeded(value),
            Ok(Err(WorkError::Stopped)) => Outcome::Stopped,
            Ok(Err(error)) => Outcome::Failed(error),
            Err(payload) => Outcome::Failed(WorkError::Panicked(panic_message(payload))),
        };

        // A forced stop raced the body. Usually the forcing side has already
        // reported the work; if it found no worker to dispose (the hand-off
        // window), the report falls to us below via the finalize guard.
        if work.is_abandoned() {
            trace!(work_id = %work.id, "Work abandoned by forced stop; result discarded");
            break Outcome::Failed(WorkError::Interrupted);
        }

        if let Outcome::Failed(ref error) = outcome {
            let attempts = work.execute_count.load(Ordering::SeqCst);
            let retry = work.options.retry.filter(|r| attempts <= r.max_retries);
            let stop_pending = work.stop_requested() || token.is_cancelled();

            if let (Some(retry), false) = (retry, stop_pending) {
                warn!(
                    work_id = %work.id,
                    attempt = attempts,
                    error = %error,
                    strategy = ?retry.strategy,
                    "Work failed; retrying"
                );
                if !retry.delay.is_zero() {
                    std::thread::sleep(retry.delay);
                }
                match retry.strategy {
                    RetryStrategy::Immediate => continue,
                    RetryStrategy::Requeue => {
                        pool.watchdog.disarm(&DeadlineKey::Work(work.id.clone()));
                        *worker.current_work.lock() = None;
                        pool.requeue(&work);
                        return;
                    }
                }
            }
        }

        break outcome;
    };

    pool.watchdog.disarm(&DeadlineKey::Work(work.id.clone()));
    *worker.current_work.lock() = None;

    if !work.try_finalize() {
        return; // forced stop won the race
    }
    let paused = *work.paused_total.lock();
    let execute_time = started.elapsed().saturating_sub(paused);
    pool.finish_work(&work, outcome, execute_time, Some(worker));
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(target_os = "linux")]
fn apply_thread_priority(priority: ThreadPriority) {
    if priority == ThreadPriority::Normal {
        return;
    }
    // Per-thread nice level; best effort, raising priority needs privileges.
    unsafe {
        let tid = libc::syscall(libc::SYS_gettid) as libc::id_t;
        libc::setpriority(libc::PRIO_PROCESS as _, tid, priority.nice_value());
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_thread_priority(_priority: ThreadPriority) {}
