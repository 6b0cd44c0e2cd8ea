/*!
 * Kernel-Style Synchronizer Core
 *
 * Generic acquire/release engine: one mutex, one FIFO wait list of
 * requests, and a reconciliation pass after every state change.
 *
 * # Design: Delegation of Execution
 *
 * A releaser does not wake waiters to re-check shared state. It walks the
 * wait list from the head, and for every request whose predicate now holds
 * it applies the state change on that request's behalf, records the
 * outcome, and signals that request's own condvar. Exactly the threads that
 * were served wake up; there is no broadcast and no thundering herd.
 *
 * Reconciliation stops at the first head request it cannot satisfy, even if
 * a later one could proceed. This keeps admission strictly FIFO: a large
 * request is not starved by a stream of small ones.
 *
 * Variants differ only in their [`Admission`] policy: what state they keep,
 * when a payload is satisfiable, and what applying it does.
 */

use super::wait::request::{self, Request, Resolution};
use super::wait::{CancellationToken, Deadline, Outcome, Timeout, WaitList};
use crate::core::limits::DEFAULT_SYNC_NAME;
use crate::monitoring::{StatsSnapshot, WaitStats};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// State and predicate of a kernel-style synchronizer
pub trait Admission: Send + 'static {
    /// What a request asks for
    type Payload: Send + 'static;
    /// What a fulfilled request receives
    type Output: Send + 'static;

    /// Whether `payload` can be satisfied by the current state
    fn can_satisfy(&self, payload: &Self::Payload) -> bool;

    /// Transfer the resource for `payload`; only called after `can_satisfy`
    fn apply(&mut self, payload: &Self::Payload) -> Self::Output;
}

struct Inner<A: Admission> {
    admission: A,
    waiters: WaitList<Request<A::Payload, A::Output>>,
}

impl<A: Admission> Inner<A> {
    fn waiters(&mut self) -> &mut WaitList<Request<A::Payload, A::Output>> {
        &mut self.waiters
    }

    /// Fulfill head requests while their predicate holds
    fn reconcile(&mut self) -> usize {
        let mut handed_off = 0;
        while let Some(head) = self.waiters.front() {
            if !self.admission.can_satisfy(&head.payload) {
                break;
            }
            let Some(handle) = self.waiters.pop_front() else {
                break;
            };
            let request = &mut self.waiters[handle];
            let output = self.admission.apply(&request.payload);
            request.fulfill(output);
            handed_off += 1;
        }
        handed_off
    }
}

/// Generic fair blocking synchronizer over an [`Admission`] policy
pub struct KernelSync<A: Admission> {
    monitor: Arc<Mutex<Inner<A>>>,
    stats: WaitStats,
    name: String,
}

impl<A: Admission> KernelSync<A> {
    pub fn new(admission: A) -> Self {
        Self::named(DEFAULT_SYNC_NAME, admission)
    }

    /// Create with a name attached to tracing events
    pub fn named(name: impl Into<String>, admission: A) -> Self {
        Self {
            monitor: Arc::new(Mutex::new(Inner {
                admission,
                waiters: WaitList::new(),
            })),
            stats: WaitStats::new(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire `payload`, blocking up to `timeout`
    ///
    /// The fast path applies the payload directly when nobody is queued and
    /// the predicate holds. Otherwise the request joins the tail of the wait
    /// list and is fulfilled by a later release, unless it times out or is
    /// cancelled first.
    pub fn acquire(
        &self,
        payload: A::Payload,
        timeout: Timeout,
        cancel: Option<&CancellationToken>,
    ) -> Outcome<A::Output> {
        let mut guard = self.monitor.lock();

        // fast path
        let inner = &mut *guard;
        if inner.waiters.is_empty() && inner.admission.can_satisfy(&payload) {
            let output = inner.admission.apply(&payload);
            self.stats.record_fast_path();
            return Outcome::Fulfilled(output);
        }

        if timeout.is_poll() {
            self.stats.record_timed_out();
            trace!(name = %self.name, "poll not satisfiable");
            return Outcome::TimedOut;
        }

        // wait path
        let deadline = Deadline::start(timeout);
        let handle = guard.waiters.push_back(Request::new(payload));
        self.stats.record_blocked();
        debug!(name = %self.name, queued = guard.waiters.len(), "request queued");

        let resolution = request::block(
            &self.monitor,
            &mut guard,
            Inner::waiters,
            handle,
            deadline,
            cancel,
            |inner| {
                // The abandoned request may have been holding back the ones behind it
                let handed_off = inner.reconcile();
                self.stats.record_handoffs(handed_off);
            },
        );
        drop(guard);

        match &resolution {
            Resolution::Fulfilled(_) => self.stats.record_fulfilled_after_wait(),
            Resolution::TimedOut(_) => {
                self.stats.record_timed_out();
                debug!(name = %self.name, "request timed out");
            }
            Resolution::Cancelled(_) => {
                self.stats.record_cancelled();
                debug!(name = %self.name, "request cancelled");
            }
        }
        resolution.into_outcome()
    }

    /// Mutate the state, then hand the resource to satisfiable waiters
    ///
    /// Returns how many waiters were fulfilled.
    pub fn release(&self, mutate: impl FnOnce(&mut A)) -> usize {
        let mut guard = self.monitor.lock();
        mutate(&mut guard.admission);
        self.reconcile_locked(&mut guard)
    }

    /// Like [`KernelSync::release`], but the mutation may refuse
    ///
    /// On `Err` the state is left as the closure left it and no
    /// reconciliation runs.
    pub fn try_release<E>(&self, mutate: impl FnOnce(&mut A) -> Result<(), E>) -> Result<usize, E> {
        let mut guard = self.monitor.lock();
        mutate(&mut guard.admission)?;
        Ok(self.reconcile_locked(&mut guard))
    }

    /// Mutate the state without touching the wait list
    pub fn update<R>(&self, mutate: impl FnOnce(&mut A) -> R) -> R {
        mutate(&mut self.monitor.lock().admission)
    }

    /// Read the state under the lock
    pub fn inspect<R>(&self, read: impl FnOnce(&A) -> R) -> R {
        read(&self.monitor.lock().admission)
    }

    /// Number of blocked requests
    pub fn waiting(&self) -> usize {
        self.monitor.lock().waiters.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn reconcile_locked(&self, inner: &mut Inner<A>) -> usize {
        let handed_off = inner.reconcile();
        self.stats.record_handoffs(handed_off);
        if handed_off > 0 {
            trace!(name = %self.name, handed_off, remaining = inner.waiters.len(), "reconciled");
        }
        handed_off
    }
}

impl<A: Admission + std::fmt::Debug> std::fmt::Debug for KernelSync<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.monitor.lock();
        f.debug_struct("KernelSync")
            .field("name", &self.name)
            .field("state", &inner.admission)
            .field("waiting", &inner.waiters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    /// Tickets numbered in order; a request names the ticket it needs
    #[derive(Debug, Default)]
    struct Ticket {
        served: u32,
    }

    impl Admission for Ticket {
        type Payload = u32;
        type Output = u32;

        fn can_satisfy(&self, wanted: &u32) -> bool {
            self.served >= *wanted
        }

        fn apply(&mut self, wanted: &u32) -> u32 {
            *wanted
        }
    }

    #[test]
    fn test_fast_path_when_satisfiable() {
        let sync = KernelSync::new(Ticket { served: 5 });
        let outcome = sync.acquire(3, Timeout::Poll, None);
        assert_eq!(outcome, Outcome::Fulfilled(3));
        assert_eq!(sync.stats().fast_path, 1);
        assert_eq!(sync.waiting(), 0);
    }

    #[test]
    fn test_poll_never_blocks() {
        let sync = KernelSync::new(Ticket::default());
        assert_eq!(sync.acquire(1, Timeout::Poll, None), Outcome::TimedOut);
        assert_eq!(sync.waiting(), 0);
    }

    #[test]
    fn test_release_delegates_to_waiter() {
        let sync = Arc::new(KernelSync::named("tickets", Ticket::default()));

        let waiter = {
            let sync = sync.clone();
            thread::spawn(move || sync.acquire(2, Timeout::Infinite, None))
        };

        while sync.waiting() == 0 {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(sync.release(|t| t.served = 1), 0);
        assert_eq!(sync.release(|t| t.served = 2), 1);
        assert_eq!(waiter.join().unwrap(), Outcome::Fulfilled(2));

        let stats = sync.stats();
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.handoffs, 1);
        assert_eq!(stats.fulfilled_after_wait, 1);
    }

    #[test]
    fn test_try_release_refusal_skips_reconcile() {
        let sync = KernelSync::new(Ticket::default());
        let result: Result<usize, &str> = sync.try_release(|_| Err("refused"));
        assert_eq!(result, Err("refused"));
    }

    #[test]
    fn test_update_does_not_reconcile() {
        let sync = Arc::new(KernelSync::new(Ticket::default()));

        let waiter = {
            let sync = sync.clone();
            thread::spawn(move || sync.acquire(1, Timeout::After(Duration::from_millis(100)), None))
        };
        while sync.waiting() == 0 {
            thread::sleep(Duration::from_millis(5));
        }

        // Satisfiable now, but nobody delegates
        sync.update(|t| t.served = 10);
        assert_eq!(waiter.join().unwrap(), Outcome::TimedOut);
        assert_eq!(sync.inspect(|t| t.served), 10);
    }
}
