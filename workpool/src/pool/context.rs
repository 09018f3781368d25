//! Work execution context.
//!
//! A [`WorkContext`] is handed to the body on every invocation. It carries
//! the cooperation points of the stop/pause protocol:
//!
//! - [`pause_if_requested`](WorkContext::pause_if_requested) parks on the
//!   pool-wide pause gate, then on this work's own gate.
//! - [`check_if_stop_requested`](WorkContext::check_if_stop_requested) is a
//!   non-failing observation.
//! - [`stop_if_requested`](WorkContext::stop_if_requested) returns an error
//!   the body propagates with `?`; the worker boundary converts it into the
//!   `Stopped` status.
//!
//! A body that never reaches a cooperation point can only be interrupted by
//! a forced stop.

use super::core::PoolInner;
use super::error::StopRequested;
use super::work::{Work, WorkId};
use super::watchdog::DeadlineKey;
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Execution context passed to a work body.
pub struct WorkContext {
    work: Arc<Work>,
    pool: Weak<PoolInner>,
}

impl WorkContext {
    pub(crate) fn new(work: Arc<Work>, pool: Weak<PoolInner>) -> Self {
        Self { work, pool }
    }

    /// The id of the executing work.
    pub fn id(&self) -> &WorkId {
        &self.work.id
    }

    /// How many times the body has been invoked, including this attempt.
    pub fn execute_count(&self) -> u32 {
        self.work
            .execute_count
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Blocks while the pool or this work is paused.
    ///
    /// Time spent parked here is excluded from the work's timeout budget.
    pub fn pause_if_requested(&self) {
        let pool_paused = self
            .pool
            .upgrade()
            .map(|pool| !pool.pause_gate.is_open())
            .unwrap_or(false);
        if !pool_paused && !self.work.is_pausing() {
            return;
        }

        let began = Instant::now();
        if let Some(pool) = self.pool.upgrade() {
            pool.pause_gate.wait();
        }
        self.work.pause_gate.wait();

        let parked = began.elapsed();
        *self.work.paused_total.lock() += parked;
        if let Some(pool) = self.pool.upgrade() {
            pool.watchdog
                .extend(&DeadlineKey::Work(self.work.id.clone()), parked);
        }
    }

    /// Returns true if a stop has been requested for the pool or this work.
    pub fn check_if_stop_requested(&self) -> bool {
        if self.work.stop_requested() || self.work.is_abandoned() {
            return true;
        }
        self.pool
            .upgrade()
            .map(|pool| pool.cancel_token().is_cancelled())
            .unwrap_or(true)
    }

    /// Fails with [`StopRequested`] when a stop is pending.
    ///
    /// Intended for `ctx.stop_if_requested()?` inside a body returning
    /// `Result<_, WorkError>`.
    pub fn stop_if_requested(&self) -> Result<(), StopRequested> {
        if self.check_if_stop_requested() {
            Err(StopRequested)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for WorkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkContext")
            .field("work_id", &self.work.id)
            .finish()
    }
}
