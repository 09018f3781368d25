//! Deadline watchdog.
//!
//! One background thread owns every armed deadline: the pool-wide timeout
//! and each running work's timeout. Deadlines live in a min-heap ordered by
//! expiry; the thread sleeps on a condvar until the earliest one is due and
//! then notifies the pool.
//!
//! Disarming and extending never touch the heap: each arm gets a fresh
//! sequence number and the `live` map records which sequence is current, so
//! stale heap entries fall through harmlessly when popped. Pausing a work
//! extends its deadline by the paused duration, keeping paused time out of
//! the timeout budget.

use super::work::WorkId;
use parking_lot::{Condvar, Mutex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::trace;

/// What an armed deadline belongs to.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub(crate) enum DeadlineKey {
    Pool,
    Work(WorkId),
}

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    at: Instant,
    seq: u64,
    key: DeadlineKey,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
struct Inner {
    heap: BinaryHeap<Reverse<Entry>>,
    /// Current (sequence, expiry) per key; absent means disarmed.
    live: HashMap<DeadlineKey, (u64, Instant)>,
    next_seq: u64,
    shutdown: bool,
}

/// Shared deadline state plus the thread that drains it.
#[derive(Debug, Default)]
pub(crate) struct Watchdog {
    inner: Mutex<Inner>,
    cond: Condvar,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Watchdog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Spawns the watchdog thread. Called once at pool initialization.
    pub fn start(self: Arc<Self>, pool: Weak<super::core::PoolInner>) {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return;
        }
        let watchdog = Arc::clone(&self);
        let handle = std::thread::Builder::new()
            .name("workpool-watchdog".into())
            .spawn(move || watchdog.run(pool))
            .expect("failed to spawn watchdog thread");
        *thread = Some(handle);
    }

    pub fn arm(&self, key: DeadlineKey, duration: Duration) {
        let at = Instant::now() + duration;
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.live.insert(key.clone(), (seq, at));
        inner.heap.push(Reverse(Entry { at, seq, key }));
        self.cond.notify_one();
    }

    pub fn disarm(&self, key: &DeadlineKey) {
        self.inner.lock().live.remove(key);
    }

    /// Pushes an armed deadline further out, e.g. by time spent paused.
    pub fn extend(&self, key: &DeadlineKey, by: Duration) {
        let mut inner = self.inner.lock();
        let Some(&(_, at)) = inner.live.get(key) else {
            return;
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let at = at + by;
        inner.live.insert(key.clone(), (seq, at));
        inner.heap.push(Reverse(Entry {
            at,
            seq,
            key: key.clone(),
        }));
        self.cond.notify_one();
    }

    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            inner.shutdown = true;
            inner.live.clear();
        }
        self.cond.notify_all();
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    fn run(self: Arc<Self>, pool: Weak<super::core::PoolInner>) {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                break;
            }
            let Some(Reverse(head)) = inner.heap.peek() else {
                self.cond.wait(&mut inner);
                continue;
            };

            let at = head.at;
            if at > Instant::now() {
                self.cond.wait_until(&mut inner, at);
                continue;
            }

            let Some(Reverse(entry)) = inner.heap.pop() else {
                continue;
            };
            let due = match inner.live.get(&entry.key) {
                Some(&(seq, _)) if seq == entry.seq => {
                    inner.live.remove(&entry.key);
                    true
                }
                _ => false, // disarmed or superseded
            };
            if !due {
                continue;
            }

            trace!(key = ?entry.key, "Deadline elapsed");
            drop(inner);
            match pool.upgrade() {
                Some(pool) => pool.deadline_elapsed(entry.key),
                None => return,
            }
            inner = self.inner.lock();
        }
    }
}
