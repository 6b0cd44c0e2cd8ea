/*!
 * Cooperative Cancellation
 *
 * A [`CancellationToken`] is passed into blocking calls and observed only at
 * the wake points of the wait loop. It never preempts a thread in the middle
 * of a state mutation.
 *
 * # Wakeups
 *
 * A blocked request registers a wake callback for as long as it waits.
 * `cancel()` sets the flag first and then runs every registered callback.
 * Callbacks re-acquire the synchronizer's mutex before signalling, so a
 * cancel that lands while the waiter is between its flag check and parking
 * is delivered after the park, never lost.
 *
 * Registration takes the token's own lock while the caller holds the
 * synchronizer mutex, so `cancel()` must never hold the token lock while
 * invoking callbacks. It snapshots them and releases the lock first.
 */

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

type WakeFn = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    wakers: Mutex<Vec<(u64, WakeFn)>>,
}

/// Cloneable cancellation signal shared between a canceller and waiters
///
/// The flag is sticky: a blocking call observes it but never consumes it.
/// If a cancel loses the race against a fulfillment, the call returns
/// `Fulfilled` and the flag stays set for the caller to see afterwards.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every thread blocked on this token
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);

        let wakers: Vec<WakeFn> = self
            .inner
            .wakers
            .lock()
            .iter()
            .map(|(_, wake)| Arc::clone(wake))
            .collect();

        tracing::trace!(waiters = wakers.len(), "cancellation requested");
        for wake in wakers {
            wake();
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused
    pub fn reset(&self) {
        self.inner.cancelled.store(false, Ordering::SeqCst);
    }

    /// Register a wake callback until the returned guard is dropped
    pub(crate) fn register(&self, wake: impl Fn() + Send + Sync + 'static) -> Registration<'_> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.wakers.lock().push((id, Arc::new(wake)));
        Registration { token: self, id }
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner.wakers.lock().len()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Keeps a wake callback registered with a token
pub(crate) struct Registration<'a> {
    token: &'a CancellationToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.token.inner.wakers.lock().retain(|(other, _)| *other != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cancel_is_sticky() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());

        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_registered_callbacks_run() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let registration = token.register(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(token.registered(), 1);

        token.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(registration);
        assert_eq!(token.registered(), 0);

        token.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
