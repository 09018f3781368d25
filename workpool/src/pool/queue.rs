//! Priority collection for waiting works.
//!
//! Each worker owns one of these. Items are bucketed by integer priority;
//! `get()` always drains the highest priority present. Within a bucket the
//! ordering depends on the variant selected at construction: FIFO for the
//! queue variant, LIFO for the stack variant.
//!
//! The set of present priorities is kept in a cached, descending-sorted
//! vector that is rebuilt only when a bucket is added (dirty flag). Buckets
//! that drain to empty are left in place; a priority used once tends to be
//! used again.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordering of items that share a priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueOrder {
    /// First in, first out within a priority bucket.
    #[default]
    Fifo,
    /// Last in, first out within a priority bucket.
    Lifo,
}

#[derive(Debug)]
struct Buckets<T> {
    by_priority: HashMap<i32, VecDeque<T>>,
    sorted: Vec<i32>,
    dirty: bool,
}

/// Concurrent priority queue/stack keyed by `i32` priority, larger first.
#[derive(Debug)]
pub(crate) struct PriorityCollection<T> {
    buckets: Mutex<Buckets<T>>,
    order: QueueOrder,
    len: AtomicUsize,
}

impl<T> PriorityCollection<T> {
    pub fn new(order: QueueOrder) -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                by_priority: HashMap::new(),
                sorted: Vec::new(),
                dirty: false,
            }),
            order,
            len: AtomicUsize::new(0),
        }
    }

    /// Inserts an item at the given priority.
    pub fn set(&self, item: T, priority: i32) {
        let mut guard = self.buckets.lock();
        let buckets = &mut *guard;
        match buckets.by_priority.entry(priority) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                e.get_mut().push_back(item);
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(VecDeque::from([item]));
                buckets.dirty = true;
            }
        }
        self.len.fetch_add(1, Ordering::SeqCst);
    }

    /// Removes and returns the item with the highest priority, or `None`.
    pub fn get(&self) -> Option<T> {
        let mut guard = self.buckets.lock();
        let buckets = &mut *guard;
        if buckets.dirty {
            let mut sorted: Vec<i32> = buckets.by_priority.keys().copied().collect();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            buckets.sorted = sorted;
            buckets.dirty = false;
        }

        for index in 0..buckets.sorted.len() {
            let priority = buckets.sorted[index];
            if let Some(bucket) = buckets.by_priority.get_mut(&priority) {
                let item = match self.order {
                    QueueOrder::Fifo => bucket.pop_front(),
                    QueueOrder::Lifo => bucket.pop_back(),
                };
                if let Some(item) = item {
                    self.len.fetch_sub(1, Ordering::SeqCst);
                    return Some(item);
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_returns_none() {
        let collection: PriorityCollection<u32> = PriorityCollection::new(QueueOrder::Fifo);
        assert!(collection.get().is_none());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_highest_priority_first() {
        let collection = PriorityCollection::new(QueueOrder::Fifo);
        collection.set("low", 0);
        collection.set("high", 10);
        collection.set("mid", 5);

        assert_eq!(collection.get(), Some("high"));
        assert_eq!(collection.get(), Some("mid"));
        assert_eq!(collection.get(), Some("low"));
        assert_eq!(collection.get(), None);
    }

    #[test]
    fn test_fifo_within_bucket() {
        let collection = PriorityCollection::new(QueueOrder::Fifo);
        collection.set("a", 1);
        collection.set("b", 1);
        collection.set("c", 1);

        assert_eq!(collection.get(), Some("a"));
        assert_eq!(collection.get(), Some("b"));
        assert_eq!(collection.get(), Some("c"));
    }

    #[test]
    fn test_lifo_within_bucket() {
        let collection = PriorityCollection::new(QueueOrder::Lifo);
        collection.set("a", 1);
        collection.set("b", 1);
        collection.set("c", 1);

        assert_eq!(collection.get(), Some("c"));
        assert_eq!(collection.get(), Some("b"));
        assert_eq!(collection.get(), Some("a"));
    }

    #[test]
    fn test_negative_priorities() {
        let collection = PriorityCollection::new(QueueOrder::Fifo);
        collection.set("below", -5);
        collection.set("default", 0);

        assert_eq!(collection.get(), Some("default"));
        assert_eq!(collection.get(), Some("below"));
    }

    #[test]
    fn test_reuses_drained_bucket() {
        let collection = PriorityCollection::new(QueueOrder::Fifo);
        collection.set("first", 3);
        assert_eq!(collection.get(), Some("first"));

        // Bucket 3 is now empty but still present; a later insert must land
        // in it and still drain ahead of lower priorities.
        collection.set("again", 3);
        collection.set("low", 0);
        assert_eq!(collection.get(), Some("again"));
        assert_eq!(collection.get(), Some("low"));
    }

    #[test]
    fn test_len_tracks_set_and_get() {
        let collection = PriorityCollection::new(QueueOrder::Fifo);
        collection.set(1u32, 0);
        collection.set(2, 1);
        assert_eq!(collection.len(), 2);
        collection.get();
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_concurrent_set_and_get_loses_nothing() {
        use std::sync::Arc;
        use std::thread;

        let collection = Arc::new(PriorityCollection::new(QueueOrder::Fifo));
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let collection = Arc::clone(&collection);
                thread::spawn(move || {
                    for i in 0..250 {
                        collection.set(t * 1000 + i, i % 7);
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let mut seen = 0;
        while collection.get().is_some() {
            seen += 1;
        }
        assert_eq!(seen, 1000);
    }
}
