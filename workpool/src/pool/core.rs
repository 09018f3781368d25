//! Pool core: the [`WorkPool`] handle and its shared internals.
//!
//! [`WorkPool`] is the public face; all shared state lives in [`PoolInner`],
//! reachable from worker threads and the watchdog through weak references so
//! the pool strongly owns its workers and nothing owns the pool back.
//!
//! The pool state machine is {NotRunning, Running, IdleChecked}: a pool
//! starts not running, the first accepted work flips it to running, and the
//! idle sweep passes through idle-checked on the way back (see
//! `lifecycle.rs`).

use super::config::PoolConfig;
use super::context::WorkContext;
use super::dependency::DependencyIndex;
use super::error::{PoolError, WorkError};
use super::events::{EventSink, PoolEvent, SinkRegistry};
use super::group::WorkGroup;
use super::stats::PoolStats;
use super::sync::{CancelToken, Gate};
use super::watchdog::{DeadlineKey, Watchdog};
use super::work::{BodyFn, Callback, ExecuteResult, Work, WorkId, WorkStatus, WorkValue};
use super::worker::{Worker, WorkerId};
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Pool dispatcher state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PoolState {
    NotRunning = 0,
    Running = 1,
    /// Transient state held by the idle sweep between detecting quiescence
    /// and completing the epoch teardown.
    IdleChecked = 2,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotRunning,
            1 => Self::Running,
            _ => Self::IdleChecked,
        }
    }
}

// =============================================================================
// Pool Internals
// =============================================================================

pub(crate) struct PoolInner {
    pub(crate) config: PoolConfig,
    weak_self: Weak<PoolInner>,

    state: AtomicU8,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
    disposed: AtomicBool,

    // Workers
    pub(crate) alive_workers: DashMap<WorkerId, Arc<Worker>>,
    pub(crate) idle_workers: Mutex<VecDeque<WorkerId>>,
    pub(crate) creation_lock: Mutex<()>,
    pub(crate) worker_id_counter: AtomicUsize,

    // Works
    pub(crate) setted_works: DashMap<WorkId, Arc<Work>>,
    pub(crate) group_index: DashMap<String, HashSet<WorkId>>,
    pub(crate) failed_works: DashSet<WorkId>,
    pub(crate) dependency: DependencyIndex,
    pub(crate) suspended_queue: Mutex<VecDeque<WorkId>>,
    pub(crate) suspended: AtomicBool,

    // Control
    cancel_token: RwLock<Arc<CancelToken>>,
    pub(crate) pause_gate: Gate,
    pub(crate) wait_all_gate: Gate,
    pub(crate) watchdog: Arc<Watchdog>,
    pub(crate) sinks: SinkRegistry,
    pub(crate) stats: PoolStats,

    // Counters
    pub(crate) alive_count: AtomicUsize,
    pub(crate) idle_count: AtomicUsize,
    pub(crate) running_count: AtomicUsize,
    pub(crate) long_running_count: AtomicUsize,
    pub(crate) waiting_count: AtomicUsize,
}

impl PoolInner {
    fn new(config: PoolConfig, weak_self: Weak<PoolInner>) -> Self {
        let suspended = config.start_suspended;
        Self {
            config,
            weak_self,
            state: AtomicU8::new(PoolState::NotRunning as u8),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            disposed: AtomicBool::new(false),
            alive_workers: DashMap::new(),
            idle_workers: Mutex::new(VecDeque::new()),
            creation_lock: Mutex::new(()),
            worker_id_counter: AtomicUsize::new(0),
            setted_works: DashMap::new(),
            group_index: DashMap::new(),
            failed_works: DashSet::new(),
            dependency: DependencyIndex::new(),
            suspended_queue: Mutex::new(VecDeque::new()),
            suspended: AtomicBool::new(suspended),
            cancel_token: RwLock::new(Arc::new(CancelToken::new())),
            pause_gate: Gate::new(true),
            wait_all_gate: Gate::new(true),
            watchdog: Watchdog::new(),
            sinks: SinkRegistry::default(),
            stats: PoolStats::default(),
            alive_count: AtomicUsize::new(0),
            idle_count: AtomicUsize::new(0),
            running_count: AtomicUsize::new(0),
            long_running_count: AtomicUsize::new(0),
            waiting_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn weak_handle(&self) -> Weak<PoolInner> {
        self.weak_self.clone()
    }

    pub(crate) fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub(crate) fn try_state_transition(&self, from: PoolState, to: PoolState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn cancel_token(&self) -> Arc<CancelToken> {
        Arc::clone(&self.cancel_token.read())
    }

    pub(crate) fn regenerate_cancel_token(&self) {
        *self.cancel_token.write() = Arc::new(CancelToken::new());
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn stopping(&self) -> bool {
        self.state() != PoolState::NotRunning && self.cancel_token().is_cancelled()
    }

    /// Validates the configuration and brings up the watchdog and the
    /// min-thread workers. Runs once, on the first submission.
    fn ensure_initialized(&self) -> Result<(), PoolError> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        let _guard = self.init_lock.lock();
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }

        if self.config.min_threads() > self.config.max_threads {
            return Err(PoolError::MinThreadsExceedsMax);
        }

        Arc::clone(&self.watchdog).start(self.weak_self.clone());
        for _ in 0..self.config.min_threads() {
            self.spawn_worker(false);
        }

        info!(
            max_threads = self.config.max_threads,
            min_threads = self.config.min_threads(),
            "Pool initialized"
        );
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Flips the pool into the running state, starting a new epoch.
    pub(crate) fn ensure_running(&self) {
        loop {
            match self.state() {
                PoolState::Running => return,
                PoolState::NotRunning => {
                    if self.try_state_transition(PoolState::NotRunning, PoolState::Running) {
                        self.failed_works.clear();
                        self.stats.reset();
                        self.wait_all_gate.close();
                        self.sinks.emit(PoolEvent::PoolStarted);
                        if let Some(policy) = self.config.pool_timeout {
                            self.watchdog.arm(DeadlineKey::Pool, policy.duration);
                        }
                        debug!("Pool running");
                        return;
                    }
                }
                // The idle sweep is mid-teardown; let it finish.
                PoolState::IdleChecked => std::thread::yield_now(),
            }
        }
    }

    /// Registers and routes one submission.
    pub(crate) fn submit_erased(
        &self,
        body: BodyFn,
        options: super::options::WorkOptions,
        callback: Option<Callback>,
    ) -> Result<WorkId, PoolError> {
        if self.is_disposed() {
            return Err(PoolError::Disposed);
        }
        self.ensure_initialized()?;
        if self.stopping() {
            return Err(PoolError::Stopping);
        }

        let id = match options.custom_id.clone() {
            Some(custom) => WorkId::new(custom),
            None => WorkId::auto(),
        };
        if self.setted_works.contains_key(&id) {
            return Err(PoolError::DuplicateWorkId(id.as_str().to_string()));
        }

        let work = Arc::new(Work::new(id.clone(), body, options, callback));
        self.setted_works.insert(id.clone(), Arc::clone(&work));
        self.waiting_count.fetch_add(1, Ordering::SeqCst);
        if let Some(group) = work.options.group.clone() {
            self.group_index
                .entry(group)
                .or_default()
                .insert(id.clone());
        }

        debug!(work_id = %id, priority = work.options.priority, "Work submitted");

        if self.suspended.load(Ordering::SeqCst) {
            self.suspended_queue.lock().push_back(id.clone());
            return Ok(id);
        }

        if self.dependency.register(self, &work) {
            return Ok(id); // held until prerequisites finish
        }

        self.ensure_running();
        self.set_work(&work);
        Ok(id)
    }

    /// Drains the suspended holding queue in insertion order.
    pub(crate) fn start_suspended_works(&self) {
        if !self.suspended.swap(false, Ordering::SeqCst) {
            return;
        }
        let held: Vec<WorkId> = self.suspended_queue.lock().drain(..).collect();
        debug!(count = held.len(), "Draining suspended works");
        for id in held {
            let Some(work) = self.setted_works.get(&id).map(|e| Arc::clone(e.value())) else {
                continue;
            };
            if self.dependency.register(self, &work) {
                continue;
            }
            self.ensure_running();
            self.set_work(&work);
        }
    }

    pub(crate) fn dispose(&self) -> Result<(), PoolError> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Err(PoolError::Disposed);
        }
        debug!("Pool disposing");
        self.force_stop_inner();
        self.watchdog.shutdown();
        for entry in self.alive_workers.iter() {
            entry.value().set_kill();
            entry.value().signal(super::worker::WorkerSignal::Kill);
        }
        self.alive_workers.clear();
        self.idle_workers.lock().clear();
        self.alive_count.store(0, Ordering::SeqCst);
        self.idle_count.store(0, Ordering::SeqCst);
        self.running_count.store(0, Ordering::SeqCst);
        self.long_running_count.store(0, Ordering::SeqCst);
        self.wait_all_gate.open();
        self.pause_gate.open();
        Ok(())
    }
}

impl std::fmt::Debug for PoolInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolInner")
            .field("state", &self.state())
            .field("alive", &self.alive_count.load(Ordering::SeqCst))
            .field("idle", &self.idle_count.load(Ordering::SeqCst))
            .field("running", &self.running_count.load(Ordering::SeqCst))
            .field("waiting_works", &self.waiting_count.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Work Pool
// =============================================================================

/// An in-process pool of reusable executor threads.
///
/// Submissions are dispatched across a bounded set of workers, honoring
/// priorities, dependencies, timeouts, pause/stop control, retries and
/// grouping. Dropping the pool force-stops it.
///
/// # Example
///
/// ```ignore
/// use workpool::{PoolConfig, WorkPool};
///
/// let pool = WorkPool::new(PoolConfig::default());
/// let id = pool.submit(|| 21 * 2)?;
/// pool.wait();
/// ```
pub struct WorkPool {
    inner: Arc<PoolInner>,
}

impl WorkPool {
    /// Creates a pool with the given configuration.
    ///
    /// Workers and the watchdog are brought up lazily on the first
    /// submission; an invalid configuration surfaces there.
    pub fn new(config: PoolConfig) -> Self {
        let inner = Arc::new_cyclic(|weak| PoolInner::new(config, weak.clone()));
        Self { inner }
    }

    /// Creates a pool with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PoolConfig::default())
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Submits a plain body with default options.
    pub fn submit<R, F>(&self, body: F) -> Result<WorkId, PoolError>
    where
        F: FnMut() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        self.submit_with_options(body, super::options::WorkOptions::default())
    }

    /// Submits a plain body with options.
    pub fn submit_with_options<R, F>(
        &self,
        mut body: F,
        options: super::options::WorkOptions,
    ) -> Result<WorkId, PoolError>
    where
        F: FnMut() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        self.submit_work(move |_ctx: &WorkContext| Ok(body()), options, None)
    }

    /// Submits a plain body with options and a callback.
    pub fn submit_with_callback<R, F, C>(
        &self,
        mut body: F,
        options: super::options::WorkOptions,
        callback: C,
    ) -> Result<WorkId, PoolError>
    where
        F: FnMut() -> R + Send + 'static,
        R: Send + Sync + 'static,
        C: FnOnce(ExecuteResult) + Send + 'static,
    {
        self.submit_work(
            move |_ctx: &WorkContext| Ok(body()),
            options,
            Some(Box::new(callback) as Callback),
        )
    }

    /// Canonical submission: a context-aware, fallible body.
    ///
    /// The body receives a [`WorkContext`] exposing the cooperation points of
    /// the stop/pause protocol and is re-invoked on retry.
    pub fn submit_work<R, F>(
        &self,
        mut body: F,
        options: super::options::WorkOptions,
        callback: Option<Callback>,
    ) -> Result<WorkId, PoolError>
    where
        F: FnMut(&WorkContext) -> Result<R, WorkError> + Send + 'static,
        R: Send + Sync + 'static,
    {
        let erased: BodyFn =
            Box::new(move |ctx| body(ctx).map(|value| Arc::new(value) as WorkValue));
        self.inner.submit_erased(erased, options, callback)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Dispatches works held back by a suspended-start pool.
    pub fn start(&self) {
        self.inner.start_suspended_works();
    }

    /// Blocks until the pool goes idle (or immediately when not running).
    pub fn wait(&self) {
        self.inner.wait_all_gate.wait();
    }

    /// Blocks until the pool goes idle or the timeout elapses.
    ///
    /// Returns true when the pool was idle when the call returned.
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        self.inner.wait_all_gate.wait_timeout(timeout)
    }

    /// Blocks until the given work reaches a terminal state.
    ///
    /// Returns false when the id is unknown or already finished.
    pub fn wait_for(&self, id: &WorkId) -> bool {
        let Some(work) = self.inner.setted_works.get(id).map(|e| Arc::clone(e.value())) else {
            return false;
        };
        work.wait_gate.wait();
        true
    }

    /// Requests a cooperative stop of the whole pool.
    ///
    /// Returns false when the pool is not running.
    pub fn stop(&self) -> bool {
        self.inner.stop_inner()
    }

    /// Force-stops the pool: abandons every running body, cancels every
    /// waiting work and clears the registries immediately.
    pub fn force_stop(&self) -> bool {
        self.inner.force_stop_inner()
    }

    /// Requests a cooperative stop of one work.
    ///
    /// A waiting work is cancelled outright. Returns false when the id is
    /// unknown or already finished.
    pub fn stop_work(&self, id: &WorkId) -> bool {
        self.inner.stop_work_inner(id, false)
    }

    /// Force-stops one work, abandoning its worker if the body is running.
    pub fn force_stop_work(&self, id: &WorkId) -> bool {
        self.inner.stop_work_inner(id, true)
    }

    /// Cancels a work that has not started. Returns false once it runs.
    pub fn cancel(&self, id: &WorkId) -> bool {
        self.inner.cancel_inner(id)
    }

    /// Pauses the pool: every cooperating body parks at its next
    /// `pause_if_requested` call.
    pub fn pause(&self) {
        self.inner.pause_gate.close();
    }

    /// Reopens the pool-wide pause gate.
    pub fn resume(&self) {
        self.inner.pause_gate.open();
    }

    /// Pauses one work by id.
    pub fn pause_work(&self, id: &WorkId) -> bool {
        match self.inner.setted_works.get(id) {
            Some(work) => {
                work.request_pause();
                true
            }
            None => false,
        }
    }

    /// Resumes one work. A no-op (returning false) when it was not paused.
    pub fn resume_work(&self, id: &WorkId) -> bool {
        match self.inner.setted_works.get(id) {
            Some(work) => work.clear_pause(),
            None => false,
        }
    }

    /// Releases the pool's threads. Subsequent calls fail with
    /// [`PoolError::Disposed`], as do submissions.
    pub fn dispose(&self) -> Result<(), PoolError> {
        self.inner.dispose()
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    /// Registers an event sink. Every registered sink sees every event.
    pub fn add_event_sink(&self, sink: Arc<dyn EventSink>) {
        self.inner.sinks.add(sink);
    }

    /// A facade over the works sharing a group label.
    pub fn group(&self, name: impl Into<String>) -> WorkGroup {
        WorkGroup::new(Arc::clone(&self.inner), name.into())
    }

    /// Current status of a work; `None` once it left the registry.
    pub fn work_status(&self, id: &WorkId) -> Option<WorkStatus> {
        self.inner.setted_works.get(id).map(|work| work.status())
    }

    pub fn pool_running(&self) -> bool {
        self.inner.state() != PoolState::NotRunning
    }

    pub fn pool_stopping(&self) -> bool {
        self.inner.stopping()
    }

    pub fn idle_worker_count(&self) -> usize {
        self.inner.idle_count.load(Ordering::SeqCst)
    }

    pub fn running_worker_count(&self) -> usize {
        self.inner.running_count.load(Ordering::SeqCst)
    }

    pub fn alive_worker_count(&self) -> usize {
        self.inner.alive_count.load(Ordering::SeqCst)
    }

    pub fn long_running_worker_count(&self) -> usize {
        self.inner.long_running_count.load(Ordering::SeqCst)
    }

    pub fn waiting_work_count(&self) -> usize {
        self.inner.waiting_count.load(Ordering::SeqCst)
    }

    /// Snapshot of ids currently waiting to run.
    pub fn waiting_work_ids(&self) -> Vec<WorkId> {
        self.inner
            .setted_works
            .iter()
            .filter(|entry| entry.value().status() == WorkStatus::Waiting)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Ids that ended in `Failed` during the current epoch.
    pub fn failed_work_ids(&self) -> Vec<WorkId> {
        self.inner
            .failed_works
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn total_queue_time(&self) -> std::time::Duration {
        self.inner.stats.total_queue_time()
    }

    pub fn total_execute_time(&self) -> std::time::Duration {
        self.inner.stats.total_execute_time()
    }

    pub fn total_elapsed_time(&self) -> std::time::Duration {
        self.inner.stats.total_elapsed_time()
    }

    pub fn average_queue_time(&self) -> std::time::Duration {
        self.inner.stats.average_queue_time()
    }

    pub fn average_execute_time(&self) -> std::time::Duration {
        self.inner.stats.average_execute_time()
    }

    pub fn average_elapsed_time(&self) -> std::time::Duration {
        self.inner.stats.average_elapsed_time()
    }
}

impl std::fmt::Debug for WorkPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkPool")
            .field("inner", &self.inner)
            .finish()
    }
}

impl Drop for WorkPool {
    fn drop(&mut self) {
        let _ = self.inner.dispose();
    }
}
