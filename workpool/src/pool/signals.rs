//! Stop, cancel and timeout signal handling.
//!
//! Cooperative stops flip flags that bodies observe at their cooperation
//! points. Forced stops dispose the executing worker: the work's outcome is
//! reported immediately as `Interrupted` and the detached thread discards
//! its late result. There is no way to preempt a thread safely, so a body
//! that neither cooperates nor is force-stopped runs to completion.

use super::core::{PoolInner, PoolState};
use super::error::WorkError;
use super::events::PoolEvent;
use super::watchdog::DeadlineKey;
use super::work::{Work, WorkId, WorkStatus};
use super::worker::{Outcome, Worker, WorkerSignal, WorkerState};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

impl PoolInner {
    /// Cooperative pool-wide stop: cancels the epoch token.
    pub(crate) fn stop_inner(&self) -> bool {
        if self.state() != PoolState::Running {
            return false;
        }
        debug!("Pool stop requested");
        self.cancel_token().cancel();
        true
    }

    /// Forced pool-wide stop: abandons running bodies, cancels everything
    /// else and clears the registries immediately.
    pub(crate) fn force_stop_inner(&self) -> bool {
        if self.state() != PoolState::Running {
            return false;
        }
        warn!("Pool force-stop requested");
        self.cancel_token().cancel();

        let workers: Vec<Arc<Worker>> = self
            .alive_workers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for worker in &workers {
            let current = worker.current_work.lock().clone();
            if self.abandon_worker(worker) {
                if let Some(id) = current {
                    if let Some(work) = self.setted_works.get(&id).map(|e| Arc::clone(e.value()))
                    {
                        self.finalize_interrupted(&work);
                    }
                }
            } else {
                self.kill_idle_worker(worker);
            }
        }

        let remaining: Vec<Arc<Work>> = self
            .setted_works
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for work in remaining {
            self.finalize_cancelled(&work);
        }

        self.suspended_queue.lock().clear();
        self.dependency.clear();
        self.try_idle_sweep();
        true
    }

    /// Stops one work: cancels it while waiting, requests (or forces) a stop
    /// while running. Returns false when the id is unknown or finished.
    pub(crate) fn stop_work_inner(&self, id: &WorkId, force: bool) -> bool {
        let Some(work) = self.setted_works.get(id).map(|e| Arc::clone(e.value())) else {
            return false;
        };
        match work.status() {
            WorkStatus::Waiting => {
                self.finalize_cancelled(&work);
                true
            }
            WorkStatus::Running => {
                work.request_stop();
                if force {
                    work.abandon();
                    if let Some(worker) = self.find_worker_running(id) {
                        if self.abandon_worker(&worker) {
                            self.finalize_interrupted(&work);
                            self.rescue_orphans(&worker);
                            self.try_idle_sweep();
                        }
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Cancels a not-yet-started work.
    pub(crate) fn cancel_inner(&self, id: &WorkId) -> bool {
        let Some(work) = self.setted_works.get(id).map(|e| Arc::clone(e.value())) else {
            return false;
        };
        if work.status() != WorkStatus::Waiting {
            return false;
        }
        self.finalize_cancelled(&work);
        true
    }

    // -------------------------------------------------------------------------
    // Forced disposal plumbing
    // -------------------------------------------------------------------------

    /// Disposes a worker whose body is running. Returns false if the worker
    /// was not in the running state (the drain won the race).
    pub(crate) fn abandon_worker(&self, worker: &Arc<Worker>) -> bool {
        if !worker.try_transition(WorkerState::Running, WorkerState::ToBeDisposed) {
            return false;
        }
        worker.set_kill();
        worker.signal(WorkerSignal::Kill);
        self.running_count.fetch_sub(1, Ordering::SeqCst);
        if self.alive_workers.remove(&worker.id).is_some() {
            self.alive_count.fetch_sub(1, Ordering::SeqCst);
        }
        if worker.clear_long_running() {
            self.long_running_count.fetch_sub(1, Ordering::SeqCst);
        }
        warn!(worker_id = worker.id, "Worker disposed by forced stop");
        true
    }

    /// Disposes an idle worker during a forced stop.
    fn kill_idle_worker(&self, worker: &Arc<Worker>) {
        if !worker.try_transition(WorkerState::Idle, WorkerState::ToBeDisposed) {
            return;
        }
        worker.set_kill();
        worker.signal(WorkerSignal::Kill);
        self.idle_count.fetch_sub(1, Ordering::SeqCst);
        if self.alive_workers.remove(&worker.id).is_some() {
            self.alive_count.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Reports an abandoned work as failed with `Interrupted`.
    pub(crate) fn finalize_interrupted(&self, work: &Arc<Work>) {
        work.abandon();
        work.request_stop();
        if !work.try_finalize() {
            return;
        }
        let started_at = *work.started_at.lock();
        let paused = *work.paused_total.lock();
        let execute_time = started_at
            .map(|started| started.elapsed().saturating_sub(paused))
            .unwrap_or_default();
        self.watchdog.disarm(&DeadlineKey::Work(work.id.clone()));
        self.finish_work(
            work,
            Outcome::Failed(WorkError::Interrupted),
            execute_time,
            None,
        );
    }

    /// Re-dispatches works stranded in a disposed worker's collection.
    pub(crate) fn rescue_orphans(&self, worker: &Arc<Worker>) {
        while let Some(id) = worker.queue.get() {
            if let Some(work) = self.setted_works.get(&id).map(|e| Arc::clone(e.value())) {
                if work.status() == WorkStatus::Waiting {
                    debug!(work_id = %id, "Rescuing work from disposed worker");
                    self.set_work(&work);
                }
            }
        }
    }

    fn find_worker_running(&self, id: &WorkId) -> Option<Arc<Worker>> {
        self.alive_workers
            .iter()
            .find(|entry| entry.value().current_work.lock().as_ref() == Some(id))
            .map(|entry| Arc::clone(entry.value()))
    }

    // -------------------------------------------------------------------------
    // Deadlines
    // -------------------------------------------------------------------------

    /// Watchdog notification: a pool or work deadline elapsed.
    pub(crate) fn deadline_elapsed(&self, key: DeadlineKey) {
        match key {
            DeadlineKey::Pool => {
                let Some(policy) = self.config.pool_timeout else {
                    return;
                };
                warn!(
                    timeout_ms = policy.duration.as_millis() as u64,
                    force_stop = policy.force_stop,
                    "Pool timeout elapsed"
                );
                self.sinks.emit(PoolEvent::PoolTimeout);
                if policy.force_stop {
                    self.force_stop_inner();
                } else {
                    self.stop_inner();
                }
            }
            DeadlineKey::Work(id) => {
                let Some(work) = self.setted_works.get(&id).map(|e| Arc::clone(e.value()))
                else {
                    return;
                };
                if work.status() != WorkStatus::Running {
                    return;
                }
                let policy = work.options.timeout.or(self.config.default_work_timeout);
                let force = policy.map(|p| p.force_stop).unwrap_or(false);
                warn!(work_id = %id, force_stop = force, "Work timeout elapsed");
                self.sinks.emit(PoolEvent::WorkTimeout { id: id.clone() });
                if force {
                    self.stop_work_inner(&id, true);
                } else {
                    work.request_stop();
                }
            }
        }
    }

}
