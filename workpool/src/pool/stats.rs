//! Execution counters and timing accumulators.
//!
//! Thin atomic state behind the pool's read-only surface. Reset on each
//! running transition so averages describe the current epoch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    /// Works whose body started.
    start_count: AtomicU64,

    /// Works that reached a terminal state through execution.
    end_count: AtomicU64,

    total_queue_us: AtomicU64,
    total_execute_us: AtomicU64,
    total_elapsed_us: AtomicU64,
}

impl PoolStats {
    pub fn reset(&self) {
        self.start_count.store(0, Ordering::SeqCst);
        self.end_count.store(0, Ordering::SeqCst);
        self.total_queue_us.store(0, Ordering::SeqCst);
        self.total_execute_us.store(0, Ordering::SeqCst);
        self.total_elapsed_us.store(0, Ordering::SeqCst);
    }

    pub fn record_start(&self) {
        self.start_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_end(&self, queue_time: Duration, execute_time: Duration) {
        self.end_count.fetch_add(1, Ordering::SeqCst);
        self.total_queue_us
            .fetch_add(queue_time.as_micros() as u64, Ordering::SeqCst);
        self.total_execute_us
            .fetch_add(execute_time.as_micros() as u64, Ordering::SeqCst);
        self.total_elapsed_us.fetch_add(
            (queue_time + execute_time).as_micros() as u64,
            Ordering::SeqCst,
        );
    }

    pub fn total_queue_time(&self) -> Duration {
        Duration::from_micros(self.total_queue_us.load(Ordering::SeqCst))
    }

    pub fn total_execute_time(&self) -> Duration {
        Duration::from_micros(self.total_execute_us.load(Ordering::SeqCst))
    }

    pub fn total_elapsed_time(&self) -> Duration {
        Duration::from_micros(self.total_elapsed_us.load(Ordering::SeqCst))
    }

    /// Average wait between submission and start. Zero before any work ran.
    pub fn average_queue_time(&self) -> Duration {
        Self::average(self.total_queue_us.load(Ordering::SeqCst), self.ends())
    }

    pub fn average_execute_time(&self) -> Duration {
        Self::average(self.total_execute_us.load(Ordering::SeqCst), self.ends())
    }

    pub fn average_elapsed_time(&self) -> Duration {
        Self::average(self.total_elapsed_us.load(Ordering::SeqCst), self.ends())
    }

    fn ends(&self) -> u64 {
        self.end_count.load(Ordering::SeqCst)
    }

    fn average(total_us: u64, count: u64) -> Duration {
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(total_us / count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages_are_zero_before_any_end() {
        let stats = PoolStats::default();
        assert_eq!(stats.average_queue_time(), Duration::ZERO);
        assert_eq!(stats.average_execute_time(), Duration::ZERO);
        assert_eq!(stats.average_elapsed_time(), Duration::ZERO);
    }

    #[test]
    fn test_record_and_average() {
        let stats = PoolStats::default();
        stats.record_start();
        stats.record_end(Duration::from_millis(10), Duration::from_millis(30));
        stats.record_start();
        stats.record_end(Duration::from_millis(20), Duration::from_millis(50));

        assert_eq!(stats.total_queue_time(), Duration::from_millis(30));
        assert_eq!(stats.total_execute_time(), Duration::from_millis(80));
        assert_eq!(stats.average_queue_time(), Duration::from_millis(15));
        assert_eq!(stats.average_execute_time(), Duration::from_millis(40));
        assert_eq!(stats.average_elapsed_time(), Duration::from_millis(55));
    }

    #[test]
    fn test_reset_clears_epoch() {
        let stats = PoolStats::default();
        stats.record_start();
        stats.record_end(Duration::from_millis(5), Duration::from_millis(5));
        stats.reset();
        assert_eq!(stats.total_elapsed_time(), Duration::ZERO);
        assert_eq!(stats.average_queue_time(), Duration::ZERO);
    }
}
