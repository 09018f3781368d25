//! Integration tests for the work pool.
//!
//! These tests verify the complete dispatcher workflow including:
//! - Submission, execution and callback delivery
//! - Event ordering (pool start, work start/end, pool idle)
//! - Priority draining on a single worker
//! - Dependency gating
//! - Cooperative and forced stop, pause/resume
//! - Timeouts, retries, groups and suspended start

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use workpool::{
    DependencyRelease, DestroyThreadOption, EventSink, ExecuteResult, PoolConfig, PoolError,
    PoolEvent, RetryPolicy, RetryStrategy, TimeoutPolicy, WorkContext, WorkError, WorkOptions,
    WorkPool, WorkStatus,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Sink that appends event type names to a shared log.
struct RecordingSink {
    log: Arc<Mutex<Vec<String>>>,
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &PoolEvent) {
        self.log.lock().unwrap().push(event.event_type().to_string());
    }
}

fn recording_pool(config: PoolConfig) -> (WorkPool, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pool = WorkPool::new(config);
    pool.add_event_sink(Arc::new(RecordingSink {
        log: Arc::clone(&log),
    }));
    (pool, log)
}

fn occurrences(log: &Arc<Mutex<Vec<String>>>, event: &str) -> usize {
    log.lock().unwrap().iter().filter(|e| *e == event).count()
}

/// Spins until `flag` is set, without cooperating with the stop protocol.
fn block_until(flag: &AtomicBool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while !flag.load(Ordering::SeqCst) {
        assert!(std::time::Instant::now() < deadline, "flag never set");
        thread::sleep(Duration::from_millis(5));
    }
}

// =============================================================================
// Submission and Events
// =============================================================================

#[test]
fn test_single_work_default_callback_event_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let callback_log = Arc::clone(&log);
    let received = Arc::new(Mutex::new(None));
    let received_clone = Arc::clone(&received);

    let config = PoolConfig {
        max_threads: 8,
        default_callback: Some(Arc::new(move |result: ExecuteResult| {
            callback_log
                .lock()
                .unwrap()
                .push("default_callback".to_string());
            *received_clone.lock().unwrap() = result.get::<String>().cloned();
        })),
        ..PoolConfig::default()
    };
    let pool = WorkPool::new(config);
    pool.add_event_sink(Arc::new(RecordingSink {
        log: Arc::clone(&log),
    }));

    pool.submit(|| String::from("TestOrder Result")).unwrap();
    pool.wait();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "pool_started",
            "work_started",
            "work_ended",
            "default_callback",
            "pool_idle"
        ]
    );
    assert_eq!(received.lock().unwrap().as_deref(), Some("TestOrder Result"));
}

#[test]
fn test_explicit_callback_suppresses_default() {
    let default_calls = Arc::new(AtomicUsize::new(0));
    let default_clone = Arc::clone(&default_calls);
    let explicit_calls = Arc::new(AtomicUsize::new(0));
    let explicit_clone = Arc::clone(&explicit_calls);

    let config = PoolConfig {
        default_callback: Some(Arc::new(move |_| {
            default_clone.fetch_add(1, Ordering::SeqCst);
        })),
        ..PoolConfig::default()
    };
    let pool = WorkPool::new(config);

    pool.submit_with_callback(|| 7u32, WorkOptions::default(), move |_| {
        explicit_clone.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    pool.wait();

    assert_eq!(explicit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(default_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_custom_work_id_round_trip() {
    let pool = WorkPool::with_defaults();
    let seen_id = Arc::new(Mutex::new(String::new()));
    let seen_clone = Arc::clone(&seen_id);

    let id = pool
        .submit_with_callback(
            || 1u32,
            WorkOptions::default().with_custom_id("1024"),
            move |result| {
                *seen_clone.lock().unwrap() = result.id.as_str().to_string();
            },
        )
        .unwrap();

    assert_eq!(id.as_str(), "1024");
    pool.wait();
    assert_eq!(*seen_id.lock().unwrap(), "1024");
}

#[test]
fn test_duplicate_custom_id_rejected() {
    let pool = WorkPool::with_defaults();
    let gate = Arc::new(AtomicBool::new(false));
    let gate_clone = Arc::clone(&gate);

    pool.submit_with_options(
        move || block_until(&gate_clone),
        WorkOptions::default().with_custom_id("dup"),
    )
    .unwrap();

    let second = pool.submit_with_options(|| (), WorkOptions::default().with_custom_id("dup"));
    assert!(matches!(second, Err(PoolError::DuplicateWorkId(_))));

    gate.store(true, Ordering::SeqCst);
    pool.wait();
}

#[test]
fn test_min_threads_greater_than_max_fails_on_first_submit() {
    let config = PoolConfig {
        max_threads: 10,
        destroy_thread: Some(DestroyThreadOption {
            min_threads: 100,
            keep_alive: Duration::from_secs(1),
        }),
        ..PoolConfig::default()
    };
    let pool = WorkPool::new(config);

    let error = pool.submit(|| ()).unwrap_err();
    assert_eq!(
        error.to_string(),
        "The minimum number of threads cannot be greater than the maximum number of threads."
    );
}

// =============================================================================
// Priorities
// =============================================================================

#[test]
fn test_priority_drain_order_on_single_worker() {
    let pool = WorkPool::new(PoolConfig::with_max_threads(1));
    let order = Arc::new(Mutex::new(Vec::new()));
    let gate = Arc::new(AtomicBool::new(false));
    let first_running = Arc::new(AtomicBool::new(false));

    // The first work must be on the worker before the rest are submitted,
    // so it occupies the only thread while the others pile up behind it.
    {
        let order_clone = Arc::clone(&order);
        let gate_clone = Arc::clone(&gate);
        let first_running_clone = Arc::clone(&first_running);
        pool.submit_with_callback(
            move || {
                first_running_clone.store(true, Ordering::SeqCst);
                block_until(&gate_clone);
            },
            WorkOptions::default().with_priority(0),
            move |_| order_clone.lock().unwrap().push(0),
        )
        .unwrap();
    }
    block_until(&first_running);

    for priority in [1, 2, 0, 1, 2] {
        let order_clone = Arc::clone(&order);
        pool.submit_with_callback(
            || (),
            WorkOptions::default().with_priority(priority),
            move |_| order_clone.lock().unwrap().push(priority),
        )
        .unwrap();
    }

    gate.store(true, Ordering::SeqCst);
    pool.wait();

    // The running priority-0 work cannot be preempted; the rest drain by
    // priority, FIFO among equals.
    assert_eq!(*order.lock().unwrap(), vec![0, 2, 2, 1, 1, 0]);
}

// =============================================================================
// Dependencies
// =============================================================================

#[test]
fn test_dependent_starts_after_all_prerequisites() {
    let pool = WorkPool::with_defaults();
    let w0_done = Arc::new(AtomicBool::new(false));
    let w1_done = Arc::new(AtomicBool::new(false));

    let w0_flag = Arc::clone(&w0_done);
    pool.submit_with_options(
        move || {
            thread::sleep(Duration::from_millis(60));
            w0_flag.store(true, Ordering::SeqCst);
        },
        WorkOptions::default().with_custom_id("w0"),
    )
    .unwrap();

    let w1_flag = Arc::clone(&w1_done);
    pool.submit_with_options(
        move || {
            thread::sleep(Duration::from_millis(90));
            w1_flag.store(true, Ordering::SeqCst);
        },
        WorkOptions::default().with_custom_id("w1"),
    )
    .unwrap();

    let observed = Arc::new(Mutex::new(None));
    let observed_clone = Arc::clone(&observed);
    let w0_check = Arc::clone(&w0_done);
    let w1_check = Arc::clone(&w1_done);
    pool.submit_with_callback(
        move || w0_check.load(Ordering::SeqCst) && w1_check.load(Ordering::SeqCst),
        WorkOptions::default().with_dependencies(["w0", "w1"]),
        move |result| {
            *observed_clone.lock().unwrap() = result.get::<bool>().copied();
        },
    )
    .unwrap();

    pool.wait();
    assert_eq!(*observed.lock().unwrap(), Some(true));
}

#[test]
fn test_failed_prerequisite_releases_dependent_by_default() {
    let pool = WorkPool::with_defaults();

    pool.submit_work(
        |_ctx: &WorkContext| -> Result<(), WorkError> {
            thread::sleep(Duration::from_millis(80));
            Err(WorkError::failed("prerequisite"))
        },
        WorkOptions::default().with_custom_id("failing"),
        None,
    )
    .unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let ran_clone = Arc::clone(&ran);
    pool.submit_with_options(
        move || ran_clone.store(true, Ordering::SeqCst),
        WorkOptions::default().with_dependencies(["failing"]),
    )
    .unwrap();

    pool.wait();
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_failed_prerequisite_cancels_dependent_when_configured() {
    let config = PoolConfig {
        dependency_release: DependencyRelease::SucceededOnly,
        ..PoolConfig::default()
    };
    let pool = WorkPool::new(config);

    // Holds long enough for the dependent to register against it.
    pool.submit_work(
        |_ctx: &WorkContext| -> Result<(), WorkError> {
            thread::sleep(Duration::from_millis(80));
            Err(WorkError::failed("prerequisite"))
        },
        WorkOptions::default().with_custom_id("failing"),
        None,
    )
    .unwrap();

    let status = Arc::new(Mutex::new(None));
    let status_clone = Arc::clone(&status);
    pool.submit_with_callback(
        || unreachable!("dependent must not run"),
        WorkOptions::default().with_dependencies(["failing"]),
        move |result: ExecuteResult| {
            *status_clone.lock().unwrap() = Some(result.status);
        },
    )
    .unwrap();

    pool.wait();
    assert_eq!(*status.lock().unwrap(), Some(WorkStatus::Cancelled));
}

// =============================================================================
// Stop, Cancel, Pause
// =============================================================================

#[test]
fn test_cooperative_pool_stop() {
    let (pool, log) = recording_pool(PoolConfig::default());
    let entered = Arc::new(AtomicBool::new(false));
    let entered_clone = Arc::clone(&entered);
    let status = Arc::new(Mutex::new(None));
    let status_clone = Arc::clone(&status);

    pool.submit_work(
        move |ctx: &WorkContext| -> Result<u32, WorkError> {
            entered_clone.store(true, Ordering::SeqCst);
            loop {
                ctx.stop_if_requested()?;
                thread::sleep(Duration::from_millis(5));
            }
        },
        WorkOptions::default(),
        Some(Box::new(move |result: ExecuteResult| {
            *status_clone.lock().unwrap() = Some(result.status);
        })),
    )
    .unwrap();

    block_until(&entered);
    assert!(pool.stop());
    pool.wait();

    assert_eq!(*status.lock().unwrap(), Some(WorkStatus::Stopped));
    assert_eq!(occurrences(&log, "work_stopped"), 1);
}

#[test]
fn test_stop_work_is_idempotent_after_terminal() {
    let pool = WorkPool::with_defaults();
    let id = pool.submit(|| 5u32).unwrap();
    pool.wait();

    // Terminal works report "already done" without side effects.
    assert!(!pool.stop_work(&id));
    assert!(!pool.resume_work(&id));
    assert!(!pool.cancel(&id));
}

#[test]
fn test_cancel_waiting_work() {
    let pool = WorkPool::new(PoolConfig::with_max_threads(1));
    let gate = Arc::new(AtomicBool::new(false));
    let gate_clone = Arc::clone(&gate);
    pool.submit(move || block_until(&gate_clone)).unwrap();

    let status = Arc::new(Mutex::new(None));
    let status_clone = Arc::clone(&status);
    let queued = pool
        .submit_with_callback(
            || unreachable!("cancelled work must not run"),
            WorkOptions::default(),
            move |result: ExecuteResult| {
                *status_clone.lock().unwrap() = Some(result.status);
            },
        )
        .unwrap();

    assert!(pool.cancel(&queued));
    assert!(!pool.cancel(&queued));

    gate.store(true, Ordering::SeqCst);
    pool.wait();
    assert_eq!(*status.lock().unwrap(), Some(WorkStatus::Cancelled));
}

#[test]
fn test_pool_pause_blocks_cooperating_body() {
    let pool = WorkPool::with_defaults();
    let progressed = Arc::new(AtomicUsize::new(0));
    let progressed_clone = Arc::clone(&progressed);

    pool.pause();
    pool.submit_work(
        move |ctx: &WorkContext| -> Result<(), WorkError> {
            ctx.pause_if_requested();
            progressed_clone.store(1, Ordering::SeqCst);
            Ok(())
        },
        WorkOptions::default(),
        None,
    )
    .unwrap();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(progressed.load(Ordering::SeqCst), 0);

    pool.resume();
    pool.wait();
    assert_eq!(progressed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_per_work_pause_and_resume() {
    let pool = WorkPool::with_defaults();
    let progressed = Arc::new(AtomicUsize::new(0));
    let progressed_clone = Arc::clone(&progressed);
    let entered = Arc::new(AtomicBool::new(false));
    let entered_clone = Arc::clone(&entered);

    let id = pool
        .submit_work(
            move |ctx: &WorkContext| -> Result<(), WorkError> {
                entered_clone.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(30));
                ctx.pause_if_requested();
                progressed_clone.store(1, Ordering::SeqCst);
                Ok(())
            },
            WorkOptions::default(),
            None,
        )
        .unwrap();

    assert!(pool.pause_work(&id));
    block_until(&entered);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(progressed.load(Ordering::SeqCst), 0);

    assert!(pool.resume_work(&id));
    pool.wait();
    assert_eq!(progressed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_forced_stop_of_noncooperative_work() {
    let pool = WorkPool::with_defaults();
    let error = Arc::new(Mutex::new(None));
    let error_clone = Arc::clone(&error);
    let entered = Arc::new(AtomicBool::new(false));
    let entered_clone = Arc::clone(&entered);

    let id = pool
        .submit_with_callback(
            move || {
                entered_clone.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_secs(60));
            },
            WorkOptions::default(),
            move |result: ExecuteResult| {
                *error_clone.lock().unwrap() = result.error.clone();
            },
        )
        .unwrap();

    block_until(&entered);
    assert!(pool.force_stop_work(&id));
    pool.wait();

    assert_eq!(*error.lock().unwrap(), Some(WorkError::Interrupted));
}

// =============================================================================
// Timeouts
// =============================================================================

#[test]
fn test_short_work_does_not_trip_default_timeout() {
    let config = PoolConfig {
        default_work_timeout: Some(TimeoutPolicy::new(Duration::from_millis(3000), false)),
        ..PoolConfig::default()
    };
    let (pool, log) = recording_pool(config);
    let status = Arc::new(Mutex::new(None));
    let status_clone = Arc::clone(&status);

    pool.submit_with_callback(
        || thread::sleep(Duration::from_millis(100)),
        WorkOptions::default(),
        move |result: ExecuteResult| {
            *status_clone.lock().unwrap() = Some(result.status);
        },
    )
    .unwrap();
    pool.wait();

    assert_eq!(*status.lock().unwrap(), Some(WorkStatus::Succeeded));
    assert_eq!(occurrences(&log, "work_timeout"), 0);
}

#[test]
fn test_forced_work_timeout_interrupts_body() {
    let config = PoolConfig {
        default_work_timeout: Some(TimeoutPolicy::new(Duration::from_millis(150), true)),
        ..PoolConfig::default()
    };
    let (pool, log) = recording_pool(config);
    let error = Arc::new(Mutex::new(None));
    let error_clone = Arc::clone(&error);

    pool.submit_with_callback(
        || thread::sleep(Duration::from_secs(20)),
        WorkOptions::default(),
        move |result: ExecuteResult| {
            *error_clone.lock().unwrap() = result.error.clone();
        },
    )
    .unwrap();
    pool.wait();

    assert_eq!(occurrences(&log, "work_timeout"), 1);
    assert_eq!(occurrences(&log, "pool_timeout"), 0);
    assert_eq!(*error.lock().unwrap(), Some(WorkError::Interrupted));
}

#[test]
fn test_pool_timeout_rejects_new_submissions() {
    let config = PoolConfig {
        pool_timeout: Some(TimeoutPolicy::new(Duration::from_millis(120), false)),
        ..PoolConfig::default()
    };
    let (pool, log) = recording_pool(config);
    let gate = Arc::new(AtomicBool::new(false));
    let gate_clone = Arc::clone(&gate);

    pool.submit(move || block_until(&gate_clone)).unwrap();

    // Wait until the pool deadline fired; the body does not cooperate, so
    // the pool stays in its stopping window.
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while occurrences(&log, "pool_timeout") == 0 {
        assert!(std::time::Instant::now() < deadline, "pool timeout never fired");
        thread::sleep(Duration::from_millis(10));
    }
    let rejected = pool.submit(|| ());
    assert!(matches!(rejected, Err(PoolError::Stopping)));

    gate.store(true, Ordering::SeqCst);
    pool.wait();
    assert_eq!(occurrences(&log, "pool_timeout"), 1);
}

// =============================================================================
// Retries
// =============================================================================

#[test]
fn test_immediate_retry_until_success() {
    let pool = WorkPool::with_defaults();
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = Arc::clone(&attempts);
    let status = Arc::new(Mutex::new(None));
    let status_clone = Arc::clone(&status);

    pool.submit_work(
        move |_ctx: &WorkContext| -> Result<usize, WorkError> {
            let attempt = attempts_clone.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < 3 {
                Err(WorkError::failed("flaky"))
            } else {
                Ok(attempt)
            }
        },
        WorkOptions::default().with_retry(RetryPolicy::new(5, RetryStrategy::Immediate)),
        Some(Box::new(move |result: ExecuteResult| {
            *status_clone.lock().unwrap() = Some(result.status);
        })),
    )
    .unwrap();
    pool.wait();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(*status.lock().unwrap(), Some(WorkStatus::Succeeded));
}

#[test]
fn test_requeue_retry_exhaustion_fails() {
    let pool = WorkPool::with_defaults();
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = Arc::clone(&attempts);
    let status = Arc::new(Mutex::new(None));
    let status_clone = Arc::clone(&status);

    let id = pool
        .submit_work(
            move |_ctx: &WorkContext| -> Result<(), WorkError> {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                Err(WorkError::failed("always"))
            },
            WorkOptions::default().with_retry(RetryPolicy::new(2, RetryStrategy::Requeue)),
            Some(Box::new(move |result: ExecuteResult| {
                *status_clone.lock().unwrap() = Some(result.status);
            })),
        )
        .unwrap();
    pool.wait();

    // First run plus two requeued retries.
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(*status.lock().unwrap(), Some(WorkStatus::Failed));
    assert!(pool.failed_work_ids().contains(&id));
}

// =============================================================================
// Groups
// =============================================================================

#[test]
fn test_group_cancel_of_waiting_members() {
    let pool = WorkPool::new(PoolConfig::with_max_threads(1));
    let gate = Arc::new(AtomicBool::new(false));
    let gate_clone = Arc::clone(&gate);
    pool.submit(move || block_until(&gate_clone)).unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let ran_clone = Arc::clone(&ran);
        pool.submit_with_options(
            move || ran_clone.fetch_add(1, Ordering::SeqCst),
            WorkOptions::default().with_group("batch"),
        )
        .unwrap();
    }

    let group = pool.group("batch");
    assert_eq!(group.member_ids().len(), 3);
    let missed = group.cancel();
    assert!(missed.is_empty());

    gate.store(true, Ordering::SeqCst);
    pool.wait();
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(pool.group("batch").member_ids().is_empty());
}

// =============================================================================
// Suspended Start
// =============================================================================

#[test]
fn test_suspended_start_holds_until_start() {
    let config = PoolConfig {
        start_suspended: true,
        ..PoolConfig::default()
    };
    let pool = WorkPool::new(config);
    let ran = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let ran_clone = Arc::clone(&ran);
        pool.submit(move || ran_clone.fetch_add(1, Ordering::SeqCst))
            .unwrap();
    }

    thread::sleep(Duration::from_millis(80));
    assert!(!pool.pool_running());
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(pool.waiting_work_count(), 2);

    pool.start();
    pool.wait();
    assert_eq!(ran.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Long-Running Works and Counters
// =============================================================================

#[test]
fn test_long_running_work_extends_worker_cap() {
    let pool = WorkPool::new(PoolConfig::with_max_threads(1));
    let release = Arc::new(AtomicBool::new(false));

    // Occupies its own worker beyond the cap; only the short work below can
    // release it, so completion proves both ran concurrently.
    let release_clone = Arc::clone(&release);
    pool.submit_with_options(
        move || block_until(&release_clone),
        WorkOptions::default().long_running(),
    )
    .unwrap();

    let release_clone = Arc::clone(&release);
    pool.submit(move || release_clone.store(true, Ordering::SeqCst))
        .unwrap();

    pool.wait();
    assert_eq!(pool.long_running_worker_count(), 0);
}

#[test]
fn test_worker_counts_are_consistent_when_quiescent() {
    let pool = WorkPool::new(PoolConfig::with_max_threads(4));
    for _ in 0..8 {
        pool.submit(|| thread::sleep(Duration::from_millis(20)))
            .unwrap();
    }
    pool.wait();

    assert_eq!(pool.running_worker_count(), 0);
    assert_eq!(pool.waiting_work_count(), 0);
    assert_eq!(
        pool.alive_worker_count(),
        pool.idle_worker_count() + pool.running_worker_count()
    );
    assert!(pool.alive_worker_count() <= 4);
    assert!(pool.total_execute_time() >= Duration::from_millis(20));
    assert!(pool.average_execute_time() >= Duration::from_millis(20));
}

#[test]
fn test_panicking_body_reports_failure_and_pool_survives() {
    let pool = WorkPool::with_defaults();
    let error = Arc::new(Mutex::new(None));
    let error_clone = Arc::clone(&error);

    pool.submit_with_callback(
        || panic!("body exploded"),
        WorkOptions::default(),
        move |result: ExecuteResult| {
            *error_clone.lock().unwrap() = result.error.clone();
        },
    )
    .unwrap();
    pool.wait();

    assert_eq!(
        *error.lock().unwrap(),
        Some(WorkError::Panicked("body exploded".to_string()))
    );

    // The pool keeps processing after an individual failure.
    let ok = Arc::new(AtomicBool::new(false));
    let ok_clone = Arc::clone(&ok);
    pool.submit(move || ok_clone.store(true, Ordering::SeqCst))
        .unwrap();
    pool.wait();
    assert!(ok.load(Ordering::SeqCst));
}

// =============================================================================
// Dispose
// =============================================================================

#[test]
fn test_dispose_rejects_further_use() {
    let pool = WorkPool::with_defaults();
    pool.submit(|| ()).unwrap();
    pool.wait();

    pool.dispose().unwrap();
    assert!(matches!(pool.dispose(), Err(PoolError::Disposed)));
    assert!(matches!(pool.submit(|| ()), Err(PoolError::Disposed)));
}

#[test]
fn test_wait_for_unknown_id_returns_immediately() {
    let pool = WorkPool::with_defaults();
    assert!(!pool.wait_for(&"no-such-work".into()));

    let id = pool.submit(|| thread::sleep(Duration::from_millis(30))).unwrap();
    pool.wait_for(&id);
    assert_eq!(pool.work_status(&id), None);
}
