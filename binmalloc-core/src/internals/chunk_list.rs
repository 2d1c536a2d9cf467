//! Chunk List
//!
//! An intrusive, doubly-linked, list of free chunks, threaded through their forward and backward links.
//!
//! The list only records its head and tail; the ends are null-terminated rather than looped back onto the list itself,
//! so that the list may be moved freely along with its owner.

use super::chunk::Chunk;

/// ChunkList
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChunkList {
    head: Option<Chunk>,
    tail: Option<Chunk>,
}

impl ChunkList {
    /// An empty list.
    pub(crate) const EMPTY: ChunkList = ChunkList { head: None, tail: None };

    /// Returns whether the list is empty.
    pub(crate) fn is_empty(&self) -> bool { self.head.is_none() }

    /// Returns the first chunk, the most recently pushed.
    #[cfg(test)]
    pub(crate) fn head(&self) -> Option<Chunk> { self.head }

    /// Returns the last chunk, the least recently pushed.
    #[cfg(test)]
    pub(crate) fn tail(&self) -> Option<Chunk> { self.tail }

    /// Pushes a chunk at the front.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `chunk` is free, and not in any list.
    pub(crate) unsafe fn push_front(&mut self, chunk: Chunk) {
        chunk.set_backward(None);
        chunk.set_forward(self.head);

        match self.head {
            Some(head) => head.set_backward(Some(chunk)),
            None => self.tail = Some(chunk),
        }

        self.head = Some(chunk);
    }

    /// Pops the chunk at the front, if any.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the list is not corrupted.
    pub(crate) unsafe fn pop_front(&mut self) -> Option<Chunk> {
        let head = self.head?;
        self.unlink(head);
        Some(head)
    }

    /// Pops the chunk at the back, if any.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the list is not corrupted.
    pub(crate) unsafe fn pop_back(&mut self) -> Option<Chunk> {
        let tail = self.tail?;
        self.unlink(tail);
        Some(tail)
    }

    /// Unlinks a chunk from the list.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `chunk` is in this very list.
    pub(crate) unsafe fn unlink(&mut self, chunk: Chunk) {
        let (forward, backward) = (chunk.forward(), chunk.backward());

        match backward {
            Some(backward) => backward.set_forward(forward),
            None => {
                debug_assert_eq!(Some(chunk), self.head);
                self.head = forward;
            },
        }

        match forward {
            Some(forward) => forward.set_backward(backward),
            None => {
                debug_assert_eq!(Some(chunk), self.tail);
                self.tail = backward;
            },
        }
    }

    /// Returns an iterator from head to tail.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the list is not modified during the iteration.
    pub(crate) unsafe fn iter(&self) -> ChunkIter { ChunkIter { current: self.head, forward: true } }

    /// Returns an iterator from tail to head.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the list is not modified during the iteration.
    pub(crate) unsafe fn iter_rev(&self) -> ChunkIter { ChunkIter { current: self.tail, forward: false } }
}

/// ChunkIter
pub(crate) struct ChunkIter {
    current: Option<Chunk>,
    forward: bool,
}

impl Iterator for ChunkIter {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let current = self.current?;

        //  Safety:
        //  -   The list is not modified during the iteration, as per the pre-conditions of `iter` and `iter_rev`.
        self.current = unsafe { if self.forward { current.forward() } else { current.backward() } };

        Some(current)
    }
}
