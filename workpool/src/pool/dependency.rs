//! Dependency gating.
//!
//! A submission naming prerequisites is held here until every named id has
//! reached a terminal state. The index is a reverse map from prerequisite id
//! to the works waiting on it; each held work also tracks its own remaining
//! set, so release is a cheap set-removal on the terminal path.
//!
//! A prerequisite id that is not registered in the pool counts as already
//! terminal. Whether non-`Succeeded` terminals release or cancel dependents
//! is decided by [`DependencyRelease`].
//!
//! [`DependencyRelease`]: super::config::DependencyRelease

use super::config::DependencyRelease;
use super::core::PoolInner;
use super::work::{Work, WorkId, WorkStatus};
use dashmap::DashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Reverse map: prerequisite id -> works waiting on it.
#[derive(Debug, Default)]
pub(crate) struct DependencyIndex {
    dependents: DashMap<WorkId, Vec<WorkId>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.dependents.clear();
    }

    /// Records a work against its outstanding prerequisites.
    ///
    /// Returns true when the work must be held. The work's remaining-set
    /// lock is held across the scan so a prerequisite finishing concurrently
    /// observes either the registered dependent or the filtered set, never
    /// neither.
    pub fn register(&self, pool: &PoolInner, work: &Arc<Work>) -> bool {
        let mut remaining = work.remaining_deps.lock();
        if remaining.is_empty() {
            return false;
        }

        let declared: Vec<WorkId> = remaining.iter().cloned().collect();
        for dep in declared {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .push(work.id.clone());
            if !pool.setted_works.contains_key(&dep) {
                // Already terminal (or never submitted): not outstanding.
                if let Some(mut waiting) = self.dependents.get_mut(&dep) {
                    waiting.retain(|id| id != &work.id);
                }
                remaining.remove(&dep);
            }
        }

        let held = !remaining.is_empty();
        if held {
            debug!(work_id = %work.id, outstanding = remaining.len(), "Work held on prerequisites");
        }
        held
    }

    /// Releases (or cancels) the dependents of a work that reached a
    /// terminal state.
    pub fn on_terminal(&self, pool: &PoolInner, id: &WorkId, status: WorkStatus) {
        let Some((_, waiting)) = self.dependents.remove(id) else {
            return;
        };

        let releases = status == WorkStatus::Succeeded
            || pool.config.dependency_release == DependencyRelease::AnyTerminal;

        for dependent_id in waiting {
            let Some(work) = pool
                .setted_works
                .get(&dependent_id)
                .map(|e| Arc::clone(e.value()))
            else {
                continue;
            };

            if !releases {
                debug!(
                    work_id = %dependent_id,
                    prerequisite = %id,
                    prerequisite_status = %status,
                    "Cancelling dependent of unsuccessful prerequisite"
                );
                pool.finalize_cancelled(&work);
                continue;
            }

            let ready = {
                let mut remaining = work.remaining_deps.lock();
                remaining.remove(id);
                remaining.is_empty()
            };
            if !ready {
                continue;
            }

            if pool.suspended.load(Ordering::SeqCst) {
                pool.suspended_queue.lock().push_back(dependent_id);
                continue;
            }
            debug!(work_id = %work.id, "Prerequisites satisfied; dispatching");
            pool.ensure_running();
            pool.set_work(&work);
        }
    }
}
