//! Heap Growth
//!
//! Obtains fresh memory from the Platform, and shapes it into a single free chunk.
//!
//! Each extension of the heap is closed by a sentinel word, which blocks forward consolidation past the end of the
//! heap. When an extension is not contiguous with the previous one, it is also opened by a sentinel word, which blocks
//! backward consolidation across the gap. When it is contiguous, the closing sentinel of the previous extension becomes
//! the header of the fresh chunk.

use core::ptr::NonNull;

use crate::{ChunkSize, Configuration, Platform};

use super::chunk::{Chunk, Tag};

const WORD: usize = ChunkSize::WORD;

/// Growth
pub(crate) struct Growth {
    //  The sentinel closing the heap, if any extension ever succeeded.
    top: Option<Chunk>,
    //  The end of the range returned by the last extension.
    end: usize,
    //  The first chunk of the most recent non-contiguous extension.
    #[cfg(test)]
    base: Option<Chunk>,
    //  The total number of bytes obtained from the Platform.
    acquired: usize,
}

impl Growth {
    /// Creates an instance, which has not obtained any memory.
    pub(crate) const fn new() -> Self {
        Self { top: None, end: 0, #[cfg(test)] base: None, acquired: 0 }
    }

    /// Returns the number of bytes obtained from the Platform.
    pub(crate) fn acquired(&self) -> usize { self.acquired }

    /// Returns the first chunk of the most recent non-contiguous extension, if any.
    #[cfg(test)]
    pub(crate) fn base(&self) -> Option<Chunk> { self.base }

    /// Returns the sentinel closing the heap, if any.
    #[cfg(test)]
    pub(crate) fn top(&self) -> Option<Chunk> { self.top }

    /// Extends the heap with a free chunk of at least `size` bytes.
    ///
    /// Returns the chunk, not filed in any list, and whether it directly follows the previous extension. On failure,
    /// nothing is modified.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `size` is a valid chunk size.
    /// -   Assumes that `platform` is the same instance on every call.
    pub(crate) unsafe fn extend<C, P>(&mut self, size: ChunkSize, platform: &P) -> Option<(Chunk, bool)>
        where
            C: Configuration,
            P: Platform,
    {
        //  Worst case: an opening sentinel, a closing sentinel, and an alignment adjustment at either end.
        let padded = size.value().checked_add(2 * (WORD + ChunkSize::ALIGNMENT.value()))?;
        let increment = C::SYSTEM_UNIT.checked_round_up(padded)?;

        let start = platform.extend(increment)?;

        let start = start.as_ptr() as usize;
        let end = start.checked_add(increment)?;

        self.acquired += increment;

        let (chunk, contiguous) = match self.top {
            Some(top) if start == self.end => (top, true),
            _ => {
                let opening = ChunkSize::ALIGNMENT.round_up(start);
                Chunk::write_sentinel(NonNull::new_unchecked(opening as *mut u8));

                let chunk = Chunk::from_raw(NonNull::new_unchecked((opening + WORD) as *mut u8));
                #[cfg(test)]
                {
                    self.base = Some(chunk);
                }

                (chunk, false)
            },
        };

        let closing = ChunkSize::ALIGNMENT.round_down(end - 2 * WORD) + WORD;
        debug_assert!(closing + WORD <= end);

        chunk.set(closing - chunk.address(), Tag::Free);
        debug_assert!(chunk.size() >= size.value());

        let top = chunk.next();
        Chunk::write_sentinel(NonNull::new_unchecked(top.as_ptr()));

        self.top = Some(top);
        self.end = end;

        Some((chunk, contiguous))
    }
}
