/*!
 * Kernel Sync Library
 * Kernel-style blocking synchronizers and lock-free structures
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{SyncError, SyncResult};
pub use crate::core::sync::{
    Admission, AtomicRange, Bounds, CancellationToken, KernelSync, Latch, MsQueue, Outcome,
    RendezvousChannel, Semaphore, SemaphoreConfig, SendOutcome, Timeout, TreiberStack,
    UnarySemaphore,
};
pub use monitoring::{init_tracing, StatsSnapshot, TracingConfig};
