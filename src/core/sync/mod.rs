/*!
 * Synchronization Primitives
 *
 * Fair, timeout-aware, cancellable blocking synchronizers built on one
 * kernel-style core, plus lock-free structures for callers that must never
 * block.
 *
 * # Architecture
 *
 * Every blocking primitive is a monitor: one mutex per instance guarding the
 * state and a FIFO wait list of requests. A thread that releases a resource
 * completes the requests it can satisfy on their owners' behalf and wakes
 * exactly those threads through their own condvars.
 *
 * - [`Semaphore`] / [`UnarySemaphore`]: N-ary units, strict FIFO admission
 * - [`RendezvousChannel`]: zero-buffer handoff between senders and receivers
 * - [`Latch`]: manual-reset event releasing every waiter on `set`
 * - [`KernelSync`]: the generic engine, parameterized by an [`Admission`] policy
 *
 * # Outcomes
 *
 * Blocking calls never error on timeout or cancellation; they return an
 * [`Outcome`]. A request that was fulfilled reports `Fulfilled` even when
 * its deadline or a cancel arrived at the same moment.
 */

mod channel;
mod config;
mod kernel;
mod latch;
pub mod lockfree;
mod semaphore;
pub mod wait;

pub use channel::{RendezvousChannel, SendOutcome};
pub use config::SemaphoreConfig;
pub use kernel::{Admission, KernelSync};
pub use latch::{Flag, Latch};
pub use lockfree::{AtomicRange, Bounds, MsQueue, TreiberStack};
pub use semaphore::{Semaphore, UnarySemaphore, Units};
pub use wait::{CancellationToken, Deadline, Outcome, Remaining, Timeout};
