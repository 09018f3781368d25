//! Worker acquisition and work assignment.
//!
//! Acquisition order: reuse an idle worker, grow under the cap, then balance
//! onto the least-loaded busy worker. The cap is extended by the count of
//! long-running works so they do not starve short tasks.
//!
//! The claim flag serializes dispatchers against each other and against a
//! worker trying to retire itself: whoever wins the CAS owns the worker for
//! the duration of the hand-off.

use super::core::PoolInner;
use super::work::{Work, WorkStatus};
use super::worker::{worker_loop, Worker, WorkerSignal, WorkerState};
use crossbeam_channel::unbounded;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

impl PoolInner {
    /// Assigns a work to a worker and wakes it.
    pub(crate) fn set_work(&self, work: &Arc<Work>) {
        // A stopping pool dispatches nothing; released dependents and
        // requeued retries are cancelled instead of stranded.
        if self.stopping() {
            self.finalize_cancelled(work);
            return;
        }

        let worker = self.get_worker(work.options.long_running);

        if work.options.long_running && worker.mark_long_running() {
            self.long_running_count.fetch_add(1, Ordering::SeqCst);
        }

        *work.queued_at.lock() = Instant::now();
        worker.queue.set(work.id.clone(), work.options.priority);
        worker.release_claim();
        worker.signal(WorkerSignal::Run);

        trace!(
            work_id = %work.id,
            worker_id = worker.id,
            priority = work.options.priority,
            "Work assigned"
        );
    }

    /// Re-submits a work whose retry policy chose requeueing.
    pub(crate) fn requeue(&self, work: &Arc<Work>) {
        work.set_status(WorkStatus::Waiting);
        self.waiting_count.fetch_add(1, Ordering::SeqCst);
        debug!(work_id = %work.id, "Work requeued for retry");
        self.set_work(work);
    }

    /// Claims a worker: idle reuse, then growth, then least-loaded balancing.
    pub(crate) fn get_worker(&self, long_running: bool) -> Arc<Worker> {
        loop {
            // 1. Reuse an idle worker. Stale queue entries (retired or
            //    already-claimed workers) fall through the claim CAS.
            loop {
                let candidate = self.idle_workers.lock().pop_front();
                let Some(id) = candidate else { break };
                if let Some(worker) = self.alive_workers.get(&id).map(|e| Arc::clone(e.value())) {
                    if !worker.killed() && worker.try_claim() {
                        return worker;
                    }
                }
            }

            // 2. Grow while under the cap. Long-running works extend it: the
            //    count of already-marked workers plus the one being placed.
            //    A zero cap is treated as one worker.
            let cap = |inner: &Self| {
                inner.config.max_threads.max(1)
                    + inner.long_running_count.load(Ordering::SeqCst)
                    + usize::from(long_running)
            };
            if self.alive_count.load(Ordering::SeqCst) < cap(self) {
                let _guard = self.creation_lock.lock();
                if self.alive_count.load(Ordering::SeqCst) < cap(self) {
                    return self.spawn_worker(true);
                }
            }

            // 3. Saturated: pick the claimable non-long-running worker with
            //    the fewest pending works, releasing a previous candidate on
            //    improvement.
            let mut best: Option<Arc<Worker>> = None;
            for entry in self.alive_workers.iter() {
                let candidate = Arc::clone(entry.value());
                if candidate.killed()
                    || candidate.is_long_running()
                    || candidate.state() == WorkerState::ToBeDisposed
                {
                    continue;
                }
                if let Some(ref current) = best {
                    if candidate.queue.len() >= current.queue.len() {
                        continue;
                    }
                }
                if candidate.try_claim() {
                    if let Some(previous) = best.take() {
                        previous.release_claim();
                    }
                    best = Some(candidate);
                }
            }
            if let Some(worker) = best {
                return worker;
            }

            // Everything claimed or disposed this instant; try again.
            std::thread::yield_now();
        }
    }

    /// Constructs a worker and spawns its thread.
    ///
    /// A `claimed` worker is handed straight to the calling dispatcher and
    /// never enters the idle queue; an unclaimed one (min-thread warm-up)
    /// starts idle.
    pub(crate) fn spawn_worker(&self, claimed: bool) -> Arc<Worker> {
        let id = self.worker_id_counter.fetch_add(1, Ordering::SeqCst);
        let (signal_tx, signal_rx) = unbounded();
        let worker = Arc::new(Worker::new(id, self.config.queue_order, signal_tx));
        if claimed {
            worker.try_claim();
        }

        self.alive_workers.insert(id, Arc::clone(&worker));
        self.alive_count.fetch_add(1, Ordering::SeqCst);
        self.idle_count.fetch_add(1, Ordering::SeqCst);
        if !claimed {
            self.idle_workers.lock().push_back(id);
        }

        let thread_worker = Arc::clone(&worker);
        let pool = self.weak_handle();
        std::thread::Builder::new()
            .name(format!("workpool-worker-{}", id))
            .spawn(move || worker_loop(thread_worker, pool, signal_rx))
            .expect("failed to spawn worker thread");

        debug!(worker_id = id, "Worker spawned");
        worker
    }

    /// Attempts to retire an idle worker whose keep-alive expired.
    ///
    /// Fails when the pool is at its floor or a dispatcher holds the claim.
    pub(crate) fn try_retire(&self, worker: &Arc<Worker>) -> bool {
        let Some(destroy) = self.config.destroy_thread else {
            return false;
        };
        if self.alive_count.load(Ordering::SeqCst) <= destroy.min_threads {
            return false;
        }
        if !worker.try_claim() {
            return false;
        }
        if !worker.queue.is_empty()
            || !worker.try_transition(WorkerState::Idle, WorkerState::ToBeDisposed)
        {
            worker.release_claim();
            return false;
        }

        self.alive_workers.remove(&worker.id);
        self.alive_count.fetch_sub(1, Ordering::SeqCst);
        self.idle_count.fetch_sub(1, Ordering::SeqCst);
        true
    }
}
