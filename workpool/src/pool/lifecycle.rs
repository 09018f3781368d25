//! Work and pool lifecycle bookkeeping.
//!
//! The terminal transition of a work happens in exactly one place,
//! [`PoolInner::finish_work`]: status, counters, events, callback, gates,
//! registry removal and dependency release, in that order. The callback runs
//! before the `WorkEnded` waiters observe the gate, and every `WorkEnded`
//! precedes `PoolIdle` because the idle sweep only fires once the finishing
//! worker has gone idle.

use super::core::{PoolInner, PoolState};
use super::error::WorkError;
use super::events::{ErrorSource, PoolEvent};
use super::watchdog::DeadlineKey;
use super::work::{ExecuteResult, Work, WorkStatus};
use super::worker::{Outcome, Worker};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

impl PoolInner {
    /// Bookkeeping for a body that is about to run.
    pub(crate) fn on_work_started(&self, work: &Arc<Work>, worker: &Arc<Worker>) {
        self.waiting_count.fetch_sub(1, Ordering::SeqCst);
        *work.started_at.lock() = Some(Instant::now());
        *worker.current_work.lock() = Some(work.id.clone());
        self.stats.record_start();
        self.sinks.emit(PoolEvent::WorkStarted {
            id: work.id.clone(),
        });
        debug!(work_id = %work.id, worker_id = worker.id, "Work started");
    }

    /// Terminal bookkeeping for an executed work.
    ///
    /// The caller must have won `Work::try_finalize`.
    pub(crate) fn finish_work(
        &self,
        work: &Arc<Work>,
        outcome: Outcome,
        execute_time: Duration,
        worker: Option<&Arc<Worker>>,
    ) {
        let (status, value, error) = match outcome {
            Outcome::Succeeded(value) => (WorkStatus::Succeeded, Some(value), None),
            Outcome::Stopped => (WorkStatus::Stopped, None, Some(WorkError::Stopped)),
            Outcome::Failed(err) => (WorkStatus::Failed, None, Some(err)),
        };
        work.set_status(status);

        let queue_time = {
            let queued_at = *work.queued_at.lock();
            let started_at = *work.started_at.lock();
            started_at
                .map(|started| started.duration_since(queued_at))
                .unwrap_or_default()
        };
        self.stats.record_end(queue_time, execute_time);
        if status == WorkStatus::Failed {
            self.failed_works.insert(work.id.clone());
        }

        match status {
            WorkStatus::Succeeded => {
                debug!(
                    work_id = %work.id,
                    execute_ms = execute_time.as_millis() as u64,
                    "Work succeeded"
                );
            }
            WorkStatus::Stopped => {
                warn!(work_id = %work.id, "Work stopped");
            }
            _ => {
                error!(
                    work_id = %work.id,
                    error = %error.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "Work failed"
                );
            }
        }

        let result = ExecuteResult {
            id: work.id.clone(),
            status,
            value,
            error,
            queue_time,
            execute_time,
        };

        self.sinks.emit(PoolEvent::WorkEnded {
            result: result.clone(),
        });
        if status == WorkStatus::Stopped {
            self.sinks.emit(PoolEvent::WorkStopped {
                id: work.id.clone(),
                forced: false,
            });
        } else if result.error == Some(WorkError::Interrupted) {
            self.sinks.emit(PoolEvent::WorkStopped {
                id: work.id.clone(),
                forced: true,
            });
        }

        self.invoke_callback(work, result);
        self.release_work(work, status);

        if let Some(worker) = worker {
            if work.options.long_running && worker.clear_long_running() {
                self.long_running_count.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Terminal bookkeeping for a work that never ran.
    ///
    /// No `WorkEnded` is emitted; the callback still fires so the caller
    /// learns the work's fate.
    pub(crate) fn finalize_cancelled(&self, work: &Arc<Work>) {
        if !work.transition(WorkStatus::Waiting, WorkStatus::Cancelled) {
            return;
        }
        if !work.try_finalize() {
            return;
        }
        self.waiting_count.fetch_sub(1, Ordering::SeqCst);
        debug!(work_id = %work.id, "Work cancelled before start");

        let result = ExecuteResult {
            id: work.id.clone(),
            status: WorkStatus::Cancelled,
            value: None,
            error: Some(WorkError::Cancelled),
            queue_time: Duration::ZERO,
            execute_time: Duration::ZERO,
        };
        self.invoke_callback(work, result);
        self.release_work(work, WorkStatus::Cancelled);
        self.try_idle_sweep();
    }

    /// Invokes the per-work callback, or the pool default when none was
    /// given. Panics are contained and reported via the `Error` event.
    pub(crate) fn invoke_callback(&self, work: &Arc<Work>, result: ExecuteResult) {
        let callback = work.callback.lock().take();
        let outcome = match callback {
            Some(callback) => catch_unwind(AssertUnwindSafe(move || callback(result))),
            None => match self.config.default_callback.clone() {
                Some(default) => catch_unwind(AssertUnwindSafe(move || default(result))),
                None => return,
            },
        };
        if outcome.is_err() {
            self.sinks.emit(PoolEvent::Error {
                source: ErrorSource::Callback,
                message: format!("callback panicked for work `{}`", work.id),
            });
        }
    }

    /// Removes a terminal work from the registries, opens its wait gate and
    /// releases its dependents.
    fn release_work(&self, work: &Arc<Work>, status: WorkStatus) {
        work.wait_gate.open();
        self.setted_works.remove(&work.id);
        if let Some(group) = &work.options.group {
            if let Some(mut members) = self.group_index.get_mut(group) {
                members.remove(&work.id);
            }
        }
        self.dependency.on_terminal(self, &work.id, status);
    }

    // -------------------------------------------------------------------------
    // Worker accounting
    // -------------------------------------------------------------------------

    /// A worker picked up its first work of a drain: Idle -> Running.
    pub(crate) fn on_worker_running(&self) {
        self.idle_count.fetch_sub(1, Ordering::SeqCst);
        self.running_count.fetch_add(1, Ordering::SeqCst);
    }

    /// A worker drained its collection: Running -> Idle.
    pub(crate) fn on_worker_idle(&self, worker: &Arc<Worker>) {
        self.running_count.fetch_sub(1, Ordering::SeqCst);
        self.idle_count.fetch_add(1, Ordering::SeqCst);
        self.idle_workers.lock().push_back(worker.id);
        self.try_idle_sweep();
    }

    // -------------------------------------------------------------------------
    // Idle Sweep
    // -------------------------------------------------------------------------

    /// Ends the epoch when no worker is running and no work is waiting.
    ///
    /// The sweep passes through `IdleChecked` so a racing submission spins
    /// until the teardown completed; if one slipped in between the counter
    /// check and the CAS, the sweep aborts back to `Running`.
    pub(crate) fn try_idle_sweep(&self) {
        if self.running_count.load(Ordering::SeqCst) != 0
            || self.waiting_count.load(Ordering::SeqCst) != 0
        {
            return;
        }
        if !self.try_state_transition(PoolState::Running, PoolState::IdleChecked) {
            return;
        }
        if self.running_count.load(Ordering::SeqCst) != 0
            || self.waiting_count.load(Ordering::SeqCst) != 0
        {
            self.set_state(PoolState::Running);
            return;
        }

        debug!("Pool idle");
        self.sinks.emit(PoolEvent::PoolIdle);
        self.watchdog.disarm(&DeadlineKey::Pool);
        self.regenerate_cancel_token();
        self.pause_gate.open();
        if self.config.start_suspended {
            self.suspended.store(true, Ordering::SeqCst);
        }
        self.set_state(PoolState::NotRunning);
        self.wait_all_gate.open();
    }
}
