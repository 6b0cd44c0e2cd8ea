/*!
 * Atomic Range
 *
 * A `min <= max` pair replaced as a whole through a compare-and-swap on an
 * `ArcSwap`. Readers always see a consistent pair; writers validate against
 * the bounds they observed and retry if someone else got in first.
 */

use crate::core::errors::{SyncError, SyncResult};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Snapshot of a range's bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    fn checked(min: i64, max: i64) -> SyncResult<Self> {
        if min > max {
            return Err(SyncError::invalid_argument(format!(
                "range min {} exceeds max {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Lock-free inclusive range
///
/// # Examples
///
/// ```
/// use kernel_sync::AtomicRange;
///
/// let range = AtomicRange::new(0, 10).unwrap();
/// range.set_min(4).unwrap();
/// assert!(range.set_max(2).is_err());
/// assert_eq!((range.load().min, range.load().max), (4, 10));
/// ```
pub struct AtomicRange {
    bounds: ArcSwap<Bounds>,
}

impl AtomicRange {
    /// Rejects `min > max`
    pub fn new(min: i64, max: i64) -> SyncResult<Self> {
        Ok(Self {
            bounds: ArcSwap::from_pointee(Bounds::checked(min, max)?),
        })
    }

    #[inline]
    pub fn load(&self) -> Bounds {
        **self.bounds.load()
    }

    /// Move the lower bound; fails if it would pass the current upper bound
    pub fn set_min(&self, min: i64) -> SyncResult<Bounds> {
        self.update(|current| Bounds::checked(min, current.max))
    }

    /// Move the upper bound; fails if it would drop below the current lower bound
    pub fn set_max(&self, max: i64) -> SyncResult<Bounds> {
        self.update(|current| Bounds::checked(current.min, max))
    }

    /// Replace both bounds at once
    pub fn set(&self, min: i64, max: i64) -> SyncResult<Bounds> {
        self.update(|_| Bounds::checked(min, max))
    }

    pub fn contains(&self, value: i64) -> bool {
        self.load().contains(value)
    }

    fn update(&self, next: impl Fn(&Bounds) -> SyncResult<Bounds>) -> SyncResult<Bounds> {
        loop {
            let observed = self.bounds.load_full();
            let replacement = Arc::new(next(&observed)?);
            let previous = self
                .bounds
                .compare_and_swap(&observed, Arc::clone(&replacement));
            if Arc::ptr_eq(&*previous, &observed) {
                return Ok(*replacement);
            }
        }
    }
}

impl std::fmt::Debug for AtomicRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AtomicRange").field(&self.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_construction_validates() {
        assert!(matches!(AtomicRange::new(5, 1), Err(SyncError::InvalidArgument(_))));
        let range = AtomicRange::new(-3, 3).unwrap();
        assert!(range.contains(0));
        assert!(!range.contains(4));
    }

    #[test]
    fn test_rejected_update_keeps_bounds() {
        let range = AtomicRange::new(0, 10).unwrap();
        assert!(range.set_min(11).is_err());
        assert!(range.set_max(-1).is_err());
        assert_eq!(range.load(), Bounds { min: 0, max: 10 });

        assert_eq!(range.set(2, 2).unwrap(), Bounds { min: 2, max: 2 });
    }

    #[test]
    fn test_concurrent_updates_keep_invariant() {
        let range = Arc::new(AtomicRange::new(0, 1000).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let range = Arc::clone(&range);
                thread::spawn(move || {
                    for i in 0..500 {
                        if t % 2 == 0 {
                            let _ = range.set_min(i);
                        } else {
                            let _ = range.set_max(1000 - i);
                        }
                        let bounds = range.load();
                        assert!(bounds.min <= bounds.max);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        let bounds = range.load();
        assert!(bounds.min <= bounds.max);
    }
}
