/*!
 * Intrusive Wait List
 *
 * Ordered storage of pending requests with O(1) append, head removal and
 * removal of an arbitrary known handle.
 *
 * # Design: Index Arena With a Sentinel
 *
 * Nodes live in a `Vec` and link to each other by index, so a handle is
 * just `(index, generation)` and no raw back-pointers are needed. Slot 0 is
 * a sentinel whose `next`/`prev` are the head and tail; an empty list is a
 * sentinel pointing at itself, so link/unlink never branch on emptiness.
 *
 * Unlinking and freeing are separate steps. `pop_front` detaches the head
 * from the ordering but keeps its slot alive, so the thread that owns the
 * handle can still read the outcome a releaser recorded in it. The slot is
 * freed by `remove`, and its generation bumped so stale handles are caught.
 */

use crate::core::limits::{WAIT_LIST_INITIAL_CAPACITY, WAIT_LIST_SENTINEL as SENTINEL};
use std::ops::{Index, IndexMut};

/// Stable reference to an entry of a [`WaitList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitHandle {
    index: usize,
    generation: u64,
}

struct Node<T> {
    /// `None` only for the sentinel and for free slots
    value: Option<T>,
    prev: usize,
    next: usize,
    generation: u64,
    linked: bool,
}

impl<T> Node<T> {
    const fn vacant(index: usize) -> Self {
        Self {
            value: None,
            prev: index,
            next: index,
            generation: 0,
            linked: false,
        }
    }
}

/// Doubly linked FIFO of entries addressed by [`WaitHandle`]
///
/// Misuse (touching a handle after `remove`) is a programming error and
/// panics; it is never reported as a runtime condition.
pub struct WaitList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> WaitList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::with_capacity(WAIT_LIST_INITIAL_CAPACITY)
    }

    /// Create an empty list with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity + 1);
        nodes.push(Node::vacant(SENTINEL));
        Self {
            nodes,
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of linked entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes[SENTINEL].next == SENTINEL
    }

    /// Append at the tail and return the entry's handle
    pub fn push_back(&mut self, value: T) -> WaitHandle {
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index].value = Some(value);
                index
            }
            None => {
                let index = self.nodes.len();
                let mut node = Node::vacant(index);
                node.value = Some(value);
                self.nodes.push(node);
                index
            }
        };

        let tail = self.nodes[SENTINEL].prev;
        let node = &mut self.nodes[index];
        node.prev = tail;
        node.next = SENTINEL;
        node.linked = true;
        self.nodes[tail].next = index;
        self.nodes[SENTINEL].prev = index;
        self.len += 1;

        WaitHandle {
            index,
            generation: self.nodes[index].generation,
        }
    }

    /// Handle of the head entry
    #[inline]
    pub fn front_handle(&self) -> Option<WaitHandle> {
        let head = self.nodes[SENTINEL].next;
        (head != SENTINEL).then(|| WaitHandle {
            index: head,
            generation: self.nodes[head].generation,
        })
    }

    /// Head entry
    #[inline]
    pub fn front(&self) -> Option<&T> {
        let head = self.nodes[SENTINEL].next;
        self.nodes[head].value.as_ref()
    }

    /// Detach the head from the ordering
    ///
    /// The slot stays allocated: the returned handle remains valid until
    /// [`WaitList::remove`] is called with it.
    pub fn pop_front(&mut self) -> Option<WaitHandle> {
        let handle = self.front_handle()?;
        self.unlink(handle.index);
        Some(handle)
    }

    /// Whether the entry is still part of the ordering
    pub fn is_linked(&self, handle: WaitHandle) -> bool {
        self.checked(handle).is_some_and(|node| node.linked)
    }

    pub fn get(&self, handle: WaitHandle) -> Option<&T> {
        self.checked(handle).and_then(|node| node.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: WaitHandle) -> Option<&mut T> {
        let node = self.nodes.get_mut(handle.index)?;
        if node.generation != handle.generation || handle.index == SENTINEL {
            return None;
        }
        node.value.as_mut()
    }

    /// Unlink (if still linked) and free the entry, returning its value
    ///
    /// Returns `None` for a stale handle.
    pub fn try_remove(&mut self, handle: WaitHandle) -> Option<T> {
        self.checked(handle)?;
        self.unlink(handle.index);

        let node = &mut self.nodes[handle.index];
        let value = node.value.take()?;
        node.generation = node.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(value)
    }

    /// Unlink (if still linked) and free the entry, returning its value
    ///
    /// # Panics
    ///
    /// Panics if the handle was already removed.
    pub fn remove(&mut self, handle: WaitHandle) -> T {
        match self.try_remove(handle) {
            Some(value) => value,
            None => panic!("wait handle {handle:?} removed twice"),
        }
    }

    /// Iterate linked entries from head to tail
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.nodes[SENTINEL].next,
        }
    }

    fn checked(&self, handle: WaitHandle) -> Option<&Node<T>> {
        let node = self.nodes.get(handle.index)?;
        (handle.index != SENTINEL && node.generation == handle.generation && node.value.is_some())
            .then_some(node)
    }

    fn unlink(&mut self, index: usize) {
        if !self.nodes[index].linked {
            return;
        }

        let (prev, next) = (self.nodes[index].prev, self.nodes[index].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;

        let node = &mut self.nodes[index];
        node.prev = index;
        node.next = index;
        node.linked = false;
        self.len -= 1;
    }
}

impl<T> Default for WaitList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<WaitHandle> for WaitList<T> {
    type Output = T;

    fn index(&self, handle: WaitHandle) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("stale wait handle {handle:?}"),
        }
    }
}

impl<T> IndexMut<WaitHandle> for WaitList<T> {
    fn index_mut(&mut self, handle: WaitHandle) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("stale wait handle {handle:?}"),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for WaitList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Head-to-tail iterator over a [`WaitList`]
pub struct Iter<'a, T> {
    list: &'a WaitList<T>,
    cursor: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.cursor == SENTINEL {
            return None;
        }
        let node = &self.list.nodes[self.cursor];
        self.cursor = node.next;
        node.value.as_ref()
    }
}
