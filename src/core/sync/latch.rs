/*!
 * Broadcast Latch
 *
 * Manual-reset event on the kernel-style core. `set` raises the flag and
 * fulfills every queued waiter, each woken through its own condvar.
 * `reset` lowers the flag and leaves the wait list alone: a waiter already
 * fulfilled by an earlier `set` keeps its outcome even if `reset` runs
 * before that waiter gets scheduled.
 */

use super::kernel::{Admission, KernelSync};
use super::wait::{CancellationToken, Outcome, Timeout};
use crate::core::limits::DEFAULT_SYNC_NAME;
use crate::monitoring::StatsSnapshot;
use tracing::debug;

/// Flag admission policy: every waiter is satisfiable once the flag is up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flag {
    set: bool,
}

impl Admission for Flag {
    type Payload = ();
    type Output = ();

    #[inline]
    fn can_satisfy(&self, _: &()) -> bool {
        self.set
    }

    #[inline]
    fn apply(&mut self, _: &()) {}
}

/// Manual-reset event
///
/// # Examples
///
/// ```
/// use kernel_sync::{Latch, Outcome, Timeout};
///
/// let latch = Latch::new();
/// assert_eq!(latch.wait(Timeout::Poll, None), Outcome::TimedOut);
///
/// latch.set();
/// assert!(latch.wait(Timeout::Poll, None).is_fulfilled());
/// ```
#[derive(Debug)]
pub struct Latch {
    core: KernelSync<Flag>,
}

impl Latch {
    /// Latch starting unset
    pub fn new() -> Self {
        Self::with_state(DEFAULT_SYNC_NAME, false)
    }

    /// Latch with a tracing name and initial flag
    pub fn with_state(name: impl Into<String>, set: bool) -> Self {
        Self {
            core: KernelSync::named(name, Flag { set }),
        }
    }

    /// Raise the flag and release every blocked waiter
    pub fn set(&self) {
        let released = self.core.release(|flag| flag.set = true);
        debug!(name = self.core.name(), released, "latch set");
    }

    /// Lower the flag; waiters already released stay released
    pub fn reset(&self) {
        self.core.update(|flag| flag.set = false);
    }

    /// Wait until the flag is raised
    pub fn wait(&self, timeout: impl Into<Timeout>, cancel: Option<&CancellationToken>) -> Outcome {
        self.core.acquire((), timeout.into(), cancel)
    }

    pub fn is_set(&self) -> bool {
        self.core.inspect(|flag| flag.set)
    }

    /// Number of blocked waiters
    pub fn waiting(&self) -> usize {
        self.core.waiting()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats()
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn wait_for_queue(latch: &Latch, n: usize) {
        while latch.waiting() < n {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_initially_set() {
        let latch = Latch::with_state("gate", true);
        assert!(latch.is_set());
        assert!(latch.wait(Timeout::Poll, None).is_fulfilled());
    }

    #[test]
    fn test_set_releases_all_waiters() {
        let latch = Arc::new(Latch::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.wait(Timeout::Infinite, None))
            })
            .collect();
        wait_for_queue(&latch, 4);

        latch.set();
        for handle in handles {
            assert!(handle.join().unwrap().is_fulfilled());
        }
        assert_eq!(latch.stats().handoffs, 4);
    }

    #[test]
    fn test_reset_after_set_does_not_retract() {
        let latch = Arc::new(Latch::new());

        let waiter = {
            let latch = latch.clone();
            thread::spawn(move || latch.wait(Timeout::Infinite, None))
        };
        wait_for_queue(&latch, 1);

        // The waiter may not have run yet when reset lands; it was already fulfilled
        latch.set();
        latch.reset();

        assert!(waiter.join().unwrap().is_fulfilled());
        assert!(!latch.is_set());
        assert_eq!(latch.wait(Timeout::Poll, None), Outcome::TimedOut);
    }

    #[test]
    fn test_wait_times_out() {
        let latch = Latch::new();
        let outcome = latch.wait(Duration::from_millis(20), None);
        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(latch.waiting(), 0);
    }
}
