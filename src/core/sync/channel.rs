/*!
 * Rendezvous Channel
 *
 * Bufferless, two-sided blocking queue. A sender and a receiver meet and
 * the value moves directly from one request record to the other; nothing
 * is ever stored in the channel itself.
 *
 * # Design: Two Wait Lists, One Mutex
 *
 * Senders and receivers queue on separate lists behind a single mutex. At
 * most one list is non-empty at any time: an arriving sender first serves
 * the oldest waiting receiver, and only queues itself when there is none
 * (symmetrically for receivers).
 *
 * A sender whose request is not picked up gets its value back in
 * [`SendOutcome::TimedOut`] / [`SendOutcome::Cancelled`]. Once a receiver
 * has taken it, the sender reports `Fulfilled` even if its deadline or a
 * cancel arrives at the same moment.
 */

use super::wait::request::{self, Request, Resolution};
use super::wait::{CancellationToken, Deadline, Outcome, Timeout, WaitList};
use crate::core::limits::DEFAULT_SYNC_NAME;
use crate::monitoring::{StatsSnapshot, WaitStats};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

type SendRequest<T> = Request<Option<T>, ()>;
type ReceiveRequest<T> = Request<(), T>;

struct Lanes<T> {
    senders: WaitList<SendRequest<T>>,
    receivers: WaitList<ReceiveRequest<T>>,
}

impl<T> Lanes<T> {
    fn senders(&mut self) -> &mut WaitList<SendRequest<T>> {
        &mut self.senders
    }

    fn receivers(&mut self) -> &mut WaitList<ReceiveRequest<T>> {
        &mut self.receivers
    }

    /// Take the value from the oldest waiting sender and release it
    fn take_from_sender(&mut self) -> Option<T> {
        let handle = self.senders.pop_front()?;
        let sender = &mut self.senders[handle];
        match sender.payload.take() {
            Some(value) => {
                sender.fulfill(());
                Some(value)
            }
            None => unreachable!("queued sender without a value"),
        }
    }
}

/// Result of [`RendezvousChannel::send`]
///
/// A value that was not handed off is returned to the caller.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome<T> {
    Fulfilled,
    TimedOut(T),
    Cancelled(T),
}

impl<T> SendOutcome<T> {
    #[inline]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, SendOutcome::Fulfilled)
    }

    /// The undelivered value, if any
    pub fn into_inner(self) -> Option<T> {
        match self {
            SendOutcome::Fulfilled => None,
            SendOutcome::TimedOut(value) | SendOutcome::Cancelled(value) => Some(value),
        }
    }

    /// Same result without the value
    pub fn outcome(&self) -> Outcome {
        match self {
            SendOutcome::Fulfilled => Outcome::Fulfilled(()),
            SendOutcome::TimedOut(_) => Outcome::TimedOut,
            SendOutcome::Cancelled(_) => Outcome::Cancelled,
        }
    }
}

/// Zero-capacity channel pairing each send with exactly one receive
///
/// # Examples
///
/// ```
/// use kernel_sync::{RendezvousChannel, Timeout};
/// use std::sync::Arc;
/// use std::thread;
///
/// let channel = Arc::new(RendezvousChannel::new());
/// let tx = channel.clone();
/// let sender = thread::spawn(move || tx.send(42, Timeout::Infinite, None));
///
/// assert_eq!(channel.receive(Timeout::Infinite, None).fulfilled(), Some(42));
/// assert!(sender.join().unwrap().is_fulfilled());
/// ```
pub struct RendezvousChannel<T> {
    monitor: Arc<Mutex<Lanes<T>>>,
    stats: WaitStats,
    name: String,
}

impl<T: Send + 'static> RendezvousChannel<T> {
    pub fn new() -> Self {
        Self::named(DEFAULT_SYNC_NAME)
    }

    /// Create with a name attached to tracing events
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            monitor: Arc::new(Mutex::new(Lanes {
                senders: WaitList::new(),
                receivers: WaitList::new(),
            })),
            stats: WaitStats::new(),
            name: name.into(),
        }
    }

    /// Hand `value` to a receiver, waiting up to `timeout` for one
    pub fn send(
        &self,
        value: T,
        timeout: impl Into<Timeout>,
        cancel: Option<&CancellationToken>,
    ) -> SendOutcome<T> {
        let timeout = timeout.into();
        let mut guard = self.monitor.lock();

        // fast path: a receiver is already waiting
        if let Some(handle) = guard.receivers.pop_front() {
            guard.receivers[handle].fulfill(value);
            self.stats.record_fast_path();
            self.stats.record_handoffs(1);
            return SendOutcome::Fulfilled;
        }

        if timeout.is_poll() {
            self.stats.record_timed_out();
            return SendOutcome::TimedOut(value);
        }

        // wait path
        let deadline = Deadline::start(timeout);
        let handle = guard.senders.push_back(Request::new(Some(value)));
        self.stats.record_blocked();
        trace!(name = %self.name, queued = guard.senders.len(), "sender queued");

        // Leaving never lets anyone else through, so there is nothing to reconcile
        let resolution = request::block(
            &self.monitor,
            &mut guard,
            Lanes::senders,
            handle,
            deadline,
            cancel,
            |_| {},
        );
        drop(guard);

        match resolution {
            Resolution::Fulfilled(()) => {
                self.stats.record_fulfilled_after_wait();
                SendOutcome::Fulfilled
            }
            Resolution::TimedOut(Some(value)) => {
                self.stats.record_timed_out();
                debug!(name = %self.name, "send timed out");
                SendOutcome::TimedOut(value)
            }
            Resolution::Cancelled(Some(value)) => {
                self.stats.record_cancelled();
                debug!(name = %self.name, "send cancelled");
                SendOutcome::Cancelled(value)
            }
            Resolution::TimedOut(None) | Resolution::Cancelled(None) => {
                unreachable!("pending sender lost its value")
            }
        }
    }

    /// Take a value from a sender, waiting up to `timeout` for one
    pub fn receive(&self, timeout: impl Into<Timeout>, cancel: Option<&CancellationToken>) -> Outcome<T> {
        let timeout = timeout.into();
        let mut guard = self.monitor.lock();

        // fast path: a sender is already waiting
        if let Some(value) = guard.take_from_sender() {
            self.stats.record_fast_path();
            self.stats.record_handoffs(1);
            return Outcome::Fulfilled(value);
        }

        if timeout.is_poll() {
            self.stats.record_timed_out();
            return Outcome::TimedOut;
        }

        // wait path
        let deadline = Deadline::start(timeout);
        let handle = guard.receivers.push_back(Request::new(()));
        self.stats.record_blocked();
        trace!(name = %self.name, queued = guard.receivers.len(), "receiver queued");

        let resolution = request::block(
            &self.monitor,
            &mut guard,
            Lanes::receivers,
            handle,
            deadline,
            cancel,
            |_| {},
        );
        drop(guard);

        match &resolution {
            Resolution::Fulfilled(_) => self.stats.record_fulfilled_after_wait(),
            Resolution::TimedOut(()) => {
                self.stats.record_timed_out();
                debug!(name = %self.name, "receive timed out");
            }
            Resolution::Cancelled(()) => {
                self.stats.record_cancelled();
                debug!(name = %self.name, "receive cancelled");
            }
        }
        resolution.into_outcome()
    }

    /// Send only if a receiver is waiting right now
    pub fn try_send(&self, value: T) -> SendOutcome<T> {
        self.send(value, Timeout::Poll, None)
    }

    /// Receive only if a sender is waiting right now
    pub fn try_receive(&self) -> Option<T> {
        self.receive(Timeout::Poll, None).fulfilled()
    }

    /// Number of blocked senders
    pub fn pending_senders(&self) -> usize {
        self.monitor.lock().senders.len()
    }

    /// Number of blocked receivers
    pub fn pending_receivers(&self) -> usize {
        self.monitor.lock().receivers.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<T: Send + 'static> Default for RendezvousChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for RendezvousChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lanes = self.monitor.lock();
        f.debug_struct("RendezvousChannel")
            .field("name", &self.name)
            .field("pending_senders", &lanes.senders.len())
            .field("pending_receivers", &lanes.receivers.len())
            .finish()
    }
}
