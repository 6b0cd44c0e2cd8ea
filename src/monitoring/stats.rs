/*!
 * Wait Statistics
 *
 * Per-synchronizer counters readable without taking the synchronizer's
 * mutex. Writers already hold that mutex, so relaxed atomics suffice; a
 * snapshot may mix counters from adjacent operations, which is fine for
 * diagnostics.
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a synchronizer
#[derive(Debug, Default)]
pub struct WaitStats {
    fast_path: AtomicU64,
    blocked: AtomicU64,
    fulfilled_after_wait: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    handoffs: AtomicU64,
}

impl WaitStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_fast_path(&self) {
        self.fast_path.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_fulfilled_after_wait(&self) {
        self.fulfilled_after_wait.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_handoffs(&self, count: usize) {
        if count > 0 {
            self.handoffs.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// Copy the counters out
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fast_path: self.fast_path.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            fulfilled_after_wait: self.fulfilled_after_wait.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            handoffs: self.handoffs.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`WaitStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Requests satisfied without queueing
    pub fast_path: u64,
    /// Requests that entered the wait path
    pub blocked: u64,
    /// Blocked requests that ended fulfilled
    pub fulfilled_after_wait: u64,
    /// Requests that gave up at their deadline, including polls
    pub timed_out: u64,
    /// Blocked requests abandoned on cancellation
    pub cancelled: u64,
    /// Requests completed by another thread on their behalf
    pub handoffs: u64,
}

impl StatsSnapshot {
    /// Total requests that reached a terminal outcome
    pub fn completed(&self) -> u64 {
        self.fast_path + self.fulfilled_after_wait + self.timed_out + self.cancelled
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
