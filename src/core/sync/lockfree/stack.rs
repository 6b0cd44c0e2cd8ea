/*!
 * Treiber Stack
 * Lock-free LIFO using epoch-based reclamation
 */

use crossbeam_epoch::{self as epoch, Atomic, Owned};
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::Ordering;

struct Node<T> {
    // Moved out by the popping thread; the node itself is freed later by the epoch
    value: ManuallyDrop<T>,
    next: Atomic<Node<T>>,
}

/// Lock-free stack
///
/// `push` and `pop` retry a compare-and-swap on the head pointer. `pop` on
/// an empty stack returns `None` right away.
///
/// # Safety
///
/// Popped nodes are retired through crossbeam-epoch and only deallocated
/// once no pinned thread can still be reading them, so a concurrent `pop`
/// never dereferences freed memory and the ABA problem cannot occur.
///
/// # Examples
///
/// ```
/// use kernel_sync::TreiberStack;
///
/// let stack = TreiberStack::new();
/// stack.push(1);
/// stack.push(2);
/// assert_eq!(stack.pop(), Some(2));
/// assert_eq!(stack.pop(), Some(1));
/// assert_eq!(stack.pop(), None);
/// ```
pub struct TreiberStack<T> {
    head: Atomic<Node<T>>,
}

// Safety: a value is handed from the pushing thread to exactly one popping thread
unsafe impl<T: Send> Send for TreiberStack<T> {}
unsafe impl<T: Send> Sync for TreiberStack<T> {}

impl<T> TreiberStack<T> {
    pub fn new() -> Self {
        Self {
            head: Atomic::null(),
        }
    }

    /// Push a value on top
    pub fn push(&self, value: T) {
        let mut node = Owned::new(Node {
            value: ManuallyDrop::new(value),
            next: Atomic::null(),
        });
        let guard = epoch::pin();

        loop {
            let head = self.head.load(Ordering::Relaxed, &guard);
            node.next.store(head, Ordering::Relaxed);

            // Release publishes the node's contents together with the new head
            match self
                .head
                .compare_exchange(head, node, Ordering::Release, Ordering::Relaxed, &guard)
            {
                Ok(_) => return,
                Err(err) => node = err.new,
            }
        }
    }

    /// Pop the top value, or `None` if the stack is empty
    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();

        loop {
            let head = self.head.load(Ordering::Acquire, &guard);
            // Safe: the epoch keeps `head` alive while we are pinned
            let node = unsafe { head.as_ref() }?;
            let next = node.next.load(Ordering::Relaxed, &guard);

            if self
                .head
                .compare_exchange(head, next, Ordering::Relaxed, Ordering::Relaxed, &guard)
                .is_ok()
            {
                // Safe: winning the CAS makes us the only thread that takes the value
                // and retires the node
                unsafe {
                    guard.defer_destroy(head);
                    return Some(ManuallyDrop::into_inner(ptr::read(&node.value)));
                }
            }
        }
    }

    /// Whether the stack was empty at the moment of the check
    pub fn is_empty(&self) -> bool {
        let guard = epoch::pin();
        self.head.load(Ordering::Acquire, &guard).is_null()
    }
}

impl<T> Default for TreiberStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TreiberStack<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T> std::fmt::Debug for TreiberStack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreiberStack")
            .field("is_empty", &self.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lifo_order() {
        let stack = TreiberStack::new();
        assert!(stack.is_empty());
        for i in 0..5 {
            stack.push(i);
        }
        let popped: Vec<_> = std::iter::from_fn(|| stack.pop()).collect();
        assert_eq!(popped, vec![4, 3, 2, 1, 0]);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_drop_releases_values() {
        let marker = Arc::new(());
        {
            let stack = TreiberStack::new();
            for _ in 0..10 {
                stack.push(Arc::clone(&marker));
            }
            drop(stack.pop());
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_concurrent_push_pop() {
        let stack = Arc::new(TreiberStack::new());
        let threads = 4;
        let per_thread = 1000;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let stack = Arc::clone(&stack);
                thread::spawn(move || {
                    let mut popped = Vec::new();
                    for i in 0..per_thread {
                        stack.push(t * per_thread + i);
                        if i % 2 == 0 {
                            popped.extend(stack.pop());
                        }
                    }
                    popped
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "value {} popped twice", value);
            }
        }
        while let Some(value) = stack.pop() {
            assert!(seen.insert(value), "value {} popped twice", value);
        }
        assert_eq!(seen.len(), threads * per_thread);
    }
}
