//! Group facade.
//!
//! A group label indexes the works sharing it. The facade iterates a
//! snapshot of member ids and forwards to the per-id primitives; bulk
//! operations return the sublist of ids that were already absent or
//! finished, so callers can tell best-effort misses from hits.

use super::core::PoolInner;
use super::work::WorkId;
use std::sync::Arc;

/// View over the works sharing a group label.
///
/// Obtained from [`WorkPool::group`]; operations act on a snapshot of the
/// membership at call time.
///
/// [`WorkPool::group`]: super::core::WorkPool::group
pub struct WorkGroup {
    pool: Arc<PoolInner>,
    name: String,
}

impl WorkGroup {
    pub(crate) fn new(pool: Arc<PoolInner>, name: String) -> Self {
        Self { pool, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the ids currently in this group.
    pub fn member_ids(&self) -> Vec<WorkId> {
        self.pool
            .group_index
            .get(&self.name)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Blocks until every member reaches a terminal state.
    pub fn wait(&self) {
        for id in self.member_ids() {
            if let Some(work) = self.pool.setted_works.get(&id).map(|e| Arc::clone(e.value())) {
                work.wait_gate.wait();
            }
        }
    }

    /// Requests a cooperative stop of every member.
    ///
    /// Returns the ids that were already absent or finished.
    pub fn stop(&self) -> Vec<WorkId> {
        self.forward(|pool, id| pool.stop_work_inner(id, false))
    }

    /// Force-stops every member.
    pub fn force_stop(&self) -> Vec<WorkId> {
        self.forward(|pool, id| pool.stop_work_inner(id, true))
    }

    /// Cancels every member that has not started.
    ///
    /// Returns the ids that could not be cancelled (absent, finished or
    /// already running).
    pub fn cancel(&self) -> Vec<WorkId> {
        self.forward(|pool, id| pool.cancel_inner(id))
    }

    /// Pauses every member.
    pub fn pause(&self) -> Vec<WorkId> {
        self.forward(|pool, id| match pool.setted_works.get(id) {
            Some(work) => {
                work.request_pause();
                true
            }
            None => false,
        })
    }

    /// Resumes every paused member.
    pub fn resume(&self) -> Vec<WorkId> {
        self.forward(|pool, id| match pool.setted_works.get(id) {
            Some(work) => work.clear_pause(),
            None => false,
        })
    }

    /// Applies `operation` to the snapshot, collecting the ids it missed.
    fn forward(&self, operation: impl Fn(&Arc<PoolInner>, &WorkId) -> bool) -> Vec<WorkId> {
        self.member_ids()
            .into_iter()
            .filter(|id| !operation(&self.pool, id))
            .collect()
    }
}

impl std::fmt::Debug for WorkGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkGroup")
            .field("name", &self.name)
            .field("members", &self.member_ids().len())
            .finish()
    }
}
