//! Blocking synchronization primitives used across the pool.
//!
//! [`Gate`] is a manual-reset latch: threads calling [`Gate::wait`] pass
//! freely while the gate is open and park on a condvar while it is closed.
//! It backs the pool-wide pause gate, per-work pause gates, per-work wait
//! gates and the wait-all gate.
//!
//! [`CancelToken`] is the pool-wide cancellation signal. A token, once
//! cancelled, stays cancelled; the pool swaps in a fresh token on each
//! running epoch instead of resetting the old one, so a body that captured
//! the previous epoch's token keeps observing the stop it was given.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A manual-reset gate.
///
/// `open()` releases all current and future waiters; `close()` makes
/// subsequent `wait()` calls block until the gate is opened again.
#[derive(Debug)]
pub(crate) struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            cond: Condvar::new(),
        }
    }

    /// Opens the gate, waking every waiter.
    pub fn open(&self) {
        let mut open = self.open.lock();
        *open = true;
        self.cond.notify_all();
    }

    /// Closes the gate. Subsequent `wait()` calls block.
    pub fn close(&self) {
        *self.open.lock() = false;
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Blocks the caller until the gate is open.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }

    /// Blocks until the gate opens or the timeout elapses.
    ///
    /// Returns `true` if the gate was open when the call returned.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut open = self.open.lock();
        while !*open {
            if self.cond.wait_until(&mut open, deadline).timed_out() {
                return *open;
            }
        }
        true
    }
}

/// One-way cancellation flag shared by every work of a running epoch.
#[derive(Debug, Default)]
pub(crate) struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_gate_open_passes_immediately() {
        let gate = Gate::new(true);
        gate.wait();
        assert!(gate.is_open());
    }

    #[test]
    fn test_gate_close_blocks_until_open() {
        let gate = Arc::new(Gate::new(false));
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.wait();
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        gate.open();
        waiter.join().unwrap();
    }

    #[test]
    fn test_gate_wait_timeout_expires() {
        let gate = Gate::new(false);
        assert!(!gate.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_gate_reopen_cycle() {
        let gate = Gate::new(true);
        gate.close();
        assert!(!gate.is_open());
        gate.open();
        assert!(gate.is_open());
    }

    #[test]
    fn test_cancel_token_is_one_way() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
