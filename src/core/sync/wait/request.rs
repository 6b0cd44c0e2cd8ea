/*!
 * Requests and the Wait Path
 *
 * A [`Request`] is the node a blocked caller leaves in a wait list: the
 * payload the predicate looks at, a condition variable private to this
 * request, and the outcome slot a releaser fills in before signalling.
 *
 * [`block`] is the one wait loop shared by every synchronizer. The caller
 * has already enqueued its request under the instance mutex; `block` parks
 * on the request's own condvar until the outcome is recorded, the deadline
 * passes, or the cancellation token fires. Outcome is checked first on
 * every wake, so a fulfillment recorded under the lock always wins over a
 * concurrent timeout or cancel.
 */

use super::cancel::CancellationToken;
use super::deadline::{Deadline, Remaining};
use super::list::{WaitHandle, WaitList};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;

/// Terminal result of a blocking operation
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome<T = ()> {
    /// The request was satisfied; ownership of the resource moved to the caller
    Fulfilled(T),
    /// The deadline passed with the request still pending
    TimedOut,
    /// The cancellation token fired with the request still pending
    Cancelled,
}

impl<T> Outcome<T> {
    #[inline]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Outcome::Fulfilled(_))
    }

    #[inline]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// Fulfilled value, if any
    pub fn fulfilled(self) -> Option<T> {
        match self {
            Outcome::Fulfilled(value) => Some(value),
            Outcome::TimedOut | Outcome::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Fulfilled(value) => Outcome::Fulfilled(f(value)),
            Outcome::TimedOut => Outcome::TimedOut,
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

/// How a blocked request ended, with the payload handed back if it was
/// abandoned
#[derive(Debug)]
pub(crate) enum Resolution<P, O> {
    Fulfilled(O),
    TimedOut(P),
    Cancelled(P),
}

impl<P, O> Resolution<P, O> {
    pub(crate) fn into_outcome(self) -> Outcome<O> {
        match self {
            Resolution::Fulfilled(output) => Outcome::Fulfilled(output),
            Resolution::TimedOut(_) => Outcome::TimedOut,
            Resolution::Cancelled(_) => Outcome::Cancelled,
        }
    }
}

/// Pending request stored in a wait list
pub(crate) struct Request<P, O> {
    pub(crate) payload: P,
    /// `None` while pending; written once, under the instance mutex
    outcome: Option<O>,
    wake: Arc<Condvar>,
}

impl<P, O> Request<P, O> {
    pub(crate) fn new(payload: P) -> Self {
        Self {
            payload,
            outcome: None,
            wake: Arc::new(Condvar::new()),
        }
    }

    #[inline]
    pub(crate) fn is_pending(&self) -> bool {
        self.outcome.is_none()
    }

    /// Record the outcome and signal only this request's condvar
    pub(crate) fn fulfill(&mut self, output: O) {
        debug_assert!(self.is_pending(), "request fulfilled twice");
        self.outcome = Some(output);
        self.wake.notify_one();
    }
}

/// Selects the wait list a request lives in
pub(crate) type Lane<S, P, O> = fn(&mut S) -> &mut WaitList<Request<P, O>>;

/// Park on an enqueued request until it resolves
///
/// Must be called with `guard` locked from `monitor` and `handle` linked in
/// `lane`. The request is removed from the list before returning, whatever
/// the resolution. `on_abandon` runs under the lock right after a timed out
/// or cancelled request is unlinked, so the synchronizer can reconcile
/// waiters that were queued behind it.
pub(crate) fn block<S, P, O>(
    monitor: &Arc<Mutex<S>>,
    guard: &mut MutexGuard<'_, S>,
    lane: Lane<S, P, O>,
    handle: WaitHandle,
    deadline: Deadline,
    cancel: Option<&CancellationToken>,
    on_abandon: impl FnOnce(&mut S),
) -> Resolution<P, O>
where
    S: Send + 'static,
{
    let wake = Arc::clone(&lane(&mut **guard)[handle].wake);

    let _registration = cancel.map(|token| {
        let monitor = Arc::clone(monitor);
        let wake = Arc::clone(&wake);
        token.register(move || {
            let _guard = monitor.lock();
            wake.notify_one();
        })
    });

    loop {
        let waiters = lane(&mut **guard);
        if let Some(output) = waiters[handle].outcome.take() {
            waiters.remove(handle);
            return Resolution::Fulfilled(output);
        }

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            let request = waiters.remove(handle);
            on_abandon(&mut **guard);
            return Resolution::Cancelled(request.payload);
        }

        match deadline.remaining() {
            Remaining::Expired => {
                let request = waiters.remove(handle);
                on_abandon(&mut **guard);
                return Resolution::TimedOut(request.payload);
            }
            Remaining::Infinite => wake.wait(guard),
            Remaining::Left(left) => {
                // Spurious and early wakeups fall through to the checks above
                let _ = wake.wait_for(guard, left);
            }
        }
    }
}
