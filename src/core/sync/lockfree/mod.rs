/*!
 * Lock-Free Data Structures
 *
 * Non-blocking counterparts to the kernel-style synchronizers, for callers
 * that must never be parked:
 * - Treiber stack (epoch-reclaimed nodes)
 * - Michael-Scott queue (epoch-reclaimed nodes, empty dequeue returns `None`)
 * - Atomic range (copy-on-write bounds behind `ArcSwap`)
 */

mod queue;
mod range;
mod stack;

pub use queue::MsQueue;
pub use range::{AtomicRange, Bounds};
pub use stack::TreiberStack;
