/*!
 * Michael-Scott Queue
 * Lock-free FIFO with a sentinel head node
 *
 * `head` always points at a sentinel whose successor holds the oldest
 * value. `tail` points at the last node or, transiently, at the one before
 * it: an enqueuer links its node first and swings `tail` second, and any
 * thread that sees a lagging `tail` advances it before going on. That
 * helping step is what keeps the queue lock-free when an enqueuer stalls
 * between the two CASes.
 */

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use std::mem::MaybeUninit;
use std::sync::atomic::Ordering;

struct Node<T> {
    // Uninitialized in the sentinel and in any node whose value was dequeued
    value: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            value: MaybeUninit::uninit(),
            next: Atomic::null(),
        }
    }
}

/// Lock-free multi-producer multi-consumer queue
///
/// # Examples
///
/// ```
/// use kernel_sync::MsQueue;
///
/// let queue = MsQueue::new();
/// queue.enqueue("a");
/// queue.enqueue("b");
/// assert_eq!(queue.dequeue(), Some("a"));
/// assert_eq!(queue.dequeue(), Some("b"));
/// assert_eq!(queue.dequeue(), None);
/// ```
pub struct MsQueue<T> {
    head: Atomic<Node<T>>,
    tail: Atomic<Node<T>>,
}

// Safety: values are only moved between threads, never shared; each value is
// read by exactly one dequeuer, the one whose head CAS succeeded
unsafe impl<T: Send> Send for MsQueue<T> {}
unsafe impl<T: Send> Sync for MsQueue<T> {}

impl<T> MsQueue<T> {
    pub fn new() -> Self {
        let queue = Self {
            head: Atomic::null(),
            tail: Atomic::null(),
        };

        // Safe: nobody else can see the queue yet
        unsafe {
            let guard = epoch::unprotected();
            let sentinel = Owned::new(Node::sentinel()).into_shared(guard);
            queue.head.store(sentinel, Ordering::Relaxed);
            queue.tail.store(sentinel, Ordering::Relaxed);
        }
        queue
    }

    /// Append a value at the tail
    pub fn enqueue(&self, value: T) {
        let guard = &epoch::pin();
        let node = Owned::new(Node {
            value: MaybeUninit::new(value),
            next: Atomic::null(),
        })
        .into_shared(guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            // Safe: tail is never null and stays alive while pinned
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            if !next.is_null() {
                // Tail is lagging; help the stalled enqueuer and retry
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
                continue;
            }

            if tail_ref
                .next
                .compare_exchange(Shared::null(), node, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                // Linked. Losing this CAS is fine: someone already helped.
                let _ = self
                    .tail
                    .compare_exchange(tail, node, Ordering::Release, Ordering::Relaxed, guard);
                return;
            }
        }
    }

    /// Remove the oldest value, or `None` if the queue is empty
    ///
    /// Never blocks.
    pub fn dequeue(&self) -> Option<T> {
        let guard = &epoch::pin();
        self.pop_front(guard)
    }

    /// Whether the queue was empty at the moment of the check
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        // Safe: head is never null and stays alive while pinned
        unsafe { head.deref() }
            .next
            .load(Ordering::Acquire, guard)
            .is_null()
    }

    fn pop_front(&self, guard: &Guard) -> Option<T> {
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            // Safe: head is never null and stays alive while pinned
            let next = unsafe { head.deref() }.next.load(Ordering::Acquire, guard);
            let next_ref = unsafe { next.as_ref() }?;

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                // Never let tail point at a retired node
                let tail = self.tail.load(Ordering::Relaxed, guard);
                if tail == head {
                    let _ = self
                        .tail
                        .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
                }

                // Safe: `next` becomes the new sentinel and its value is read exactly
                // once, by the thread that won the head CAS
                unsafe {
                    guard.defer_destroy(head);
                    return Some(next_ref.value.assume_init_read());
                }
            }
        }
    }
}

impl<T> Default for MsQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for MsQueue<T> {
    fn drop(&mut self) {
        // Safe: `&mut self` means no other thread holds a reference
        unsafe {
            let guard = epoch::unprotected();
            while self.pop_front(guard).is_some() {}

            let sentinel = self.head.load(Ordering::Relaxed, guard);
            drop(sentinel.into_owned());
        }
    }
}

impl<T> std::fmt::Debug for MsQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsQueue")
            .field("is_empty", &self.is_empty())
            .finish()
    }
}
