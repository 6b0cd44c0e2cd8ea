/*!
 * Counting Semaphores
 *
 * N-ary semaphore with strict FIFO admission, built on the kernel-style
 * core. A request for `n` units is admitted when `n` units are available
 * and every earlier request has already been admitted.
 */

use super::config::SemaphoreConfig;
use super::kernel::{Admission, KernelSync};
use super::wait::{CancellationToken, Outcome, Timeout};
use crate::core::errors::{SyncError, SyncResult};
use crate::monitoring::StatsSnapshot;
use tracing::{error, warn};

/// Unit counter admission policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Units {
    available: usize,
    max: Option<usize>,
}

impl Units {
    /// Return `units` to the pool, enforcing the configured maximum
    fn put_back(&mut self, units: usize) -> SyncResult<()> {
        let total = self.available.checked_add(units).ok_or_else(|| {
            SyncError::invariant_violation(format!(
                "releasing {} units overflows {} available",
                units, self.available
            ))
        })?;

        if let Some(max) = self.max {
            if total > max {
                return Err(SyncError::invariant_violation(format!(
                    "releasing {} units brings the count to {}, above max {}",
                    units, total, max
                )));
            }
        }

        self.available = total;
        Ok(())
    }
}

impl Admission for Units {
    type Payload = usize;
    type Output = ();

    #[inline]
    fn can_satisfy(&self, requested: &usize) -> bool {
        self.available >= *requested
    }

    #[inline]
    fn apply(&mut self, requested: &usize) {
        self.available -= *requested;
    }
}

/// Fair counting semaphore
///
/// # Examples
///
/// ```
/// use kernel_sync::{Outcome, Semaphore, Timeout};
///
/// let sem = Semaphore::new(2);
/// assert!(sem.acquire(2, Timeout::Poll, None).is_fulfilled());
/// assert_eq!(sem.acquire(1, Timeout::Poll, None), Outcome::TimedOut);
///
/// sem.release(1);
/// assert_eq!(sem.available_units(), 1);
/// ```
#[derive(Debug)]
pub struct Semaphore {
    core: KernelSync<Units>,
}

impl Semaphore {
    /// Unbounded semaphore starting with `initial_units`
    pub fn new(initial_units: usize) -> Self {
        Self::from_valid(SemaphoreConfig::new(initial_units))
    }

    /// Create from a configuration, validating it first
    pub fn with_config(config: SemaphoreConfig) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: SemaphoreConfig) -> Self {
        Self {
            core: KernelSync::named(
                config.name,
                Units {
                    available: config.initial_units,
                    max: config.max_units,
                },
            ),
        }
    }

    /// Acquire `units`, waiting up to `timeout`
    ///
    /// A request larger than the configured maximum can never be admitted
    /// and holds back everyone queued after it until it gives up.
    pub fn acquire(
        &self,
        units: usize,
        timeout: impl Into<Timeout>,
        cancel: Option<&CancellationToken>,
    ) -> Outcome {
        if let Some(max) = self.max_units() {
            if units > max {
                warn!(name = self.core.name(), units, max, "request exceeds semaphore maximum");
            }
        }
        self.core.acquire(units, timeout.into(), cancel)
    }

    /// Acquire `units` only if they are available right now
    pub fn try_acquire(&self, units: usize) -> bool {
        self.acquire(units, Timeout::Poll, None).is_fulfilled()
    }

    /// Return `units` and admit waiters
    ///
    /// # Panics
    ///
    /// Panics if the release would exceed the configured maximum. That can
    /// only happen when a caller releases units it never acquired.
    pub fn release(&self, units: usize) {
        if let Err(err) = self.try_release(units) {
            error!(name = self.core.name(), error = %err, "semaphore accounting broken");
            panic!("{err}");
        }
    }

    /// Return `units` and admit waiters, reporting accounting violations
    pub fn try_release(&self, units: usize) -> SyncResult<()> {
        self.core.try_release(|pool| pool.put_back(units)).map(|_| ())
    }

    /// Units available right now
    pub fn available_units(&self) -> usize {
        self.core.inspect(|pool| pool.available)
    }

    pub fn max_units(&self) -> Option<usize> {
        self.core.inspect(|pool| pool.max)
    }

    /// Number of blocked acquirers
    pub fn waiting(&self) -> usize {
        self.core.waiting()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats()
    }
}

/// Semaphore that acquires and releases one unit at a time
#[derive(Debug)]
pub struct UnarySemaphore {
    inner: Semaphore,
}

impl UnarySemaphore {
    pub fn new(initial_units: usize) -> Self {
        Self {
            inner: Semaphore::new(initial_units),
        }
    }

    pub fn with_config(config: SemaphoreConfig) -> SyncResult<Self> {
        Semaphore::with_config(config).map(|inner| Self { inner })
    }

    pub fn acquire(&self, timeout: impl Into<Timeout>, cancel: Option<&CancellationToken>) -> Outcome {
        self.inner.acquire(1, timeout, cancel)
    }

    pub fn try_acquire(&self) -> bool {
        self.inner.try_acquire(1)
    }

    /// # Panics
    ///
    /// Panics if a configured maximum would be exceeded.
    pub fn release(&self) {
        self.inner.release(1);
    }

    pub fn available_units(&self) -> usize {
        self.inner.available_units()
    }

    pub fn waiting(&self) -> usize {
        self.inner.waiting()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_for_queue(sem: &Semaphore, n: usize) {
        while sem.waiting() < n {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_fast_path() {
        let sem = Semaphore::new(3);
        assert!(sem.try_acquire(2));
        assert!(sem.try_acquire(1));
        assert!(!sem.try_acquire(1));
        assert_eq!(sem.available_units(), 0);
        assert_eq!(sem.stats().fast_path, 2);
    }

    #[test]
    fn test_exact_units_admitted() {
        // >= not >: asking for exactly what is left succeeds
        let sem = Semaphore::new(4);
        assert!(sem.try_acquire(4));
    }

    #[test]
    fn test_timeout_leaves_state_untouched() {
        let sem = Semaphore::new(1);
        let start = Instant::now();
        let outcome = sem.acquire(2, Duration::from_millis(40), None);

        assert_eq!(outcome, Outcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(sem.available_units(), 1);
        assert_eq!(sem.waiting(), 0);
    }

    #[test]
    fn test_head_of_line_blocks_smaller_requests() {
        let sem = Arc::new(Semaphore::new(0));

        let big = {
            let sem = sem.clone();
            thread::spawn(move || sem.acquire(3, Timeout::Infinite, None))
        };
        wait_for_queue(&sem, 1);

        // One unit is free but the queue is not empty: no barging
        sem.release(1);
        assert!(!sem.try_acquire(1));
        assert_eq!(sem.available_units(), 1);

        sem.release(2);
        assert!(big.join().unwrap().is_fulfilled());
        assert_eq!(sem.available_units(), 0);
    }

    #[test]
    fn test_abandoned_head_unblocks_next() {
        let sem = Arc::new(Semaphore::new(1));
        let token = CancellationToken::new();

        let big = {
            let sem = sem.clone();
            let token = token.clone();
            thread::spawn(move || sem.acquire(5, Timeout::Infinite, Some(&token)))
        };
        wait_for_queue(&sem, 1);

        let small = {
            let sem = sem.clone();
            thread::spawn(move || sem.acquire(1, Timeout::Infinite, None))
        };
        wait_for_queue(&sem, 2);

        // When the big request gives up, reconciliation admits the small one
        token.cancel();
        assert_eq!(big.join().unwrap(), Outcome::Cancelled);
        assert!(small.join().unwrap().is_fulfilled());
        assert_eq!(sem.available_units(), 0);
    }

    #[test]
    fn test_cancel_while_blocked() {
        let sem = Arc::new(Semaphore::new(0));
        let token = CancellationToken::new();

        let waiter = {
            let sem = sem.clone();
            let token = token.clone();
            thread::spawn(move || sem.acquire(1, Timeout::Infinite, Some(&token)))
        };
        wait_for_queue(&sem, 1);

        token.cancel();
        assert_eq!(waiter.join().unwrap(), Outcome::Cancelled);
        assert_eq!(sem.waiting(), 0);
        assert_eq!(sem.stats().cancelled, 1);
    }

    #[test]
    fn test_cancelled_token_still_takes_fast_path() {
        let sem = Semaphore::new(1);
        let token = CancellationToken::new();
        token.cancel();

        assert!(sem.acquire(1, Timeout::Infinite, Some(&token)).is_fulfilled());
        assert_eq!(sem.acquire(1, Timeout::Infinite, Some(&token)), Outcome::Cancelled);
    }

    #[test]
    fn test_config_validation() {
        assert!(Semaphore::with_config(SemaphoreConfig::new(3).with_max_units(2)).is_err());

        let sem = Semaphore::with_config(SemaphoreConfig::bounded(2).with_name("pool")).unwrap();
        assert_eq!(sem.max_units(), Some(2));
        assert_eq!(sem.available_units(), 2);
    }

    #[test]
    fn test_release_past_max_is_violation() {
        let sem = Semaphore::with_config(SemaphoreConfig::bounded(2)).unwrap();
        let err = sem.try_release(1).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(sem.available_units(), 2);
    }

    #[test]
    #[should_panic(expected = "Invariant violation")]
    fn test_release_past_max_panics() {
        let sem = Semaphore::with_config(SemaphoreConfig::binary()).unwrap();
        sem.release(1);
    }

    #[test]
    fn test_unary_semaphore() {
        let sem = Arc::new(UnarySemaphore::new(1));
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());

        let waiter = {
            let sem = sem.clone();
            thread::spawn(move || sem.acquire(Duration::from_secs(5), None))
        };
        while sem.waiting() == 0 {
            thread::sleep(Duration::from_millis(2));
        }

        sem.release();
        assert!(waiter.join().unwrap().is_fulfilled());
        assert_eq!(sem.available_units(), 0);
    }
}
