//! Resize
//!
//! A block is first grown in place, by absorbing the free chunks physically following it. Only if that is not enough
//! is a new block allocated, the content copied, and the old block released.

use core::ptr::{self, NonNull};

use crate::{ChunkSize, Configuration, Platform};

use super::{
    chunk::{Chunk, Tag},
    engine::Engine,
};

impl<C, P> Engine<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Resizes a block to at least `request` bytes, preserving its content up to the smaller of both sizes.
    ///
    /// A null `pointer` is a plain allocation. On failure, returns None and leaves the block allocated, its content
    /// untouched. Requests with their top bit set always fail.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `pointer` was allocated by this instance, and not released since, or is null.
    pub(crate) unsafe fn resize(&mut self, pointer: Option<NonNull<u8>>, request: usize) -> Option<NonNull<u8>> {
        let pointer = match pointer {
            Some(pointer) => pointer,
            None => return self.allocate(request),
        };

        if request > isize::MAX as usize {
            return None;
        }

        let size = ChunkSize::from_request(request);
        let chunk = Chunk::from_payload(pointer);

        debug_assert_eq!(Tag::InUse, chunk.tag(), "{:?} not allocated", pointer);

        let original = chunk.size();

        //  Free, so that neither the draining nor the eviction may observe it as allocated.
        chunk.set(original, Tag::Free);

        self.drain_returned();
        self.evict_remainder();

        let mut total = original;

        loop {
            let next = chunk.at(total);

            if next.tag() == Tag::InUse {
                break;
            }

            self.bins.unlink(next);
            total += next.size();
        }

        if total >= size.value() {
            let room = total - size.value();

            if room >= ChunkSize::MINIMUM.value() {
                chunk.set(size.value(), Tag::InUse);

                let rest = chunk.next();
                rest.set(room, Tag::Free);
                self.bins.file_clean(rest);
            } else {
                chunk.set(total, Tag::InUse);
            }

            self.counters.resized_in_place += 1;

            return Some(pointer);
        }

        //  In use again, lest the allocation below consolidate it.
        chunk.set(total, Tag::InUse);

        let fresh = self.allocate(request)?;

        ptr::copy_nonoverlapping(pointer.as_ptr(), fresh.as_ptr(), original - ChunkSize::OVERHEAD);

        self.release(pointer);

        Some(fresh)
    }
}
