//! Aligned allocations, and their derivatives.
//!
//! An aligned allocation over-allocates with worst-case padding, then gives back the leading gap and the trailing
//! excess, if large enough, as dirty chunks.

use core::ptr::{self, NonNull};

use crate::{utils, ChunkSize, Configuration, Platform};

use super::{
    chunk::{Chunk, Tag},
    engine::Engine,
};

const MINIMUM: usize = ChunkSize::MINIMUM.value();

impl<C, P> Engine<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Allocates a block of at least `request` bytes, aligned on the least common multiple of `alignment` and of
    /// `ChunkSize::ALIGNMENT`.
    ///
    /// An `alignment` of 0 is treated as `ChunkSize::ALIGNMENT`. Requests with their top bit set always fail.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the heap is not corrupted.
    pub(crate) unsafe fn allocate_aligned(&mut self, alignment: usize, request: usize) -> Option<NonNull<u8>> {
        let minimum = ChunkSize::ALIGNMENT.value();

        let alignment = if alignment == 0 { minimum } else { utils::least_common_multiple(alignment, minimum)? };

        if request > isize::MAX as usize {
            return None;
        }

        if alignment <= minimum {
            return self.allocate(request);
        }

        let size = ChunkSize::from_request(request);

        let padded = size.value().checked_add(alignment)?.checked_add(MINIMUM)?;

        if padded > isize::MAX as usize {
            return None;
        }

        let pointer = self.allocate(padded)?;

        let mut chunk = Chunk::from_payload(pointer);
        let mut total = chunk.size();

        let address = pointer.as_ptr() as usize;
        let mut aligned = (address + alignment - 1) / alignment * alignment;

        if aligned != address {
            while aligned - address < MINIMUM {
                aligned += alignment;
            }

            let lead = aligned - address;

            chunk.set(lead, Tag::Free);
            self.bins.file_dirty(chunk);

            chunk = chunk.at(lead);
            total -= lead;
        }

        debug_assert!(total >= size.value());

        let room = total - size.value();

        if room >= MINIMUM {
            chunk.set(size.value(), Tag::InUse);

            let rest = chunk.next();
            rest.set(room, Tag::Free);
            self.bins.file_dirty(rest);
        } else {
            chunk.set(total, Tag::InUse);
        }

        debug_assert!(utils::is_aligned(chunk.payload().as_ptr() as usize, ChunkSize::ALIGNMENT));

        Some(chunk.payload())
    }

    /// Allocates a block of at least `request` bytes, aligned on the page size.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the heap is not corrupted.
    pub(crate) unsafe fn allocate_page_aligned(&mut self, request: usize) -> Option<NonNull<u8>> {
        let page_size = self.page_size();

        self.allocate_aligned(page_size.value(), request)
    }

    /// Allocates a zeroed block of at least `count * size` bytes.
    ///
    /// Returns None if `count * size` overflows, or has its top bit set.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the heap is not corrupted.
    pub(crate) unsafe fn allocate_zeroed(&mut self, count: usize, size: usize) -> Option<NonNull<u8>> {
        let request = count.checked_mul(size)?;

        if request > isize::MAX as usize {
            return None;
        }

        let pointer = self.allocate(request)?;

        ptr::write_bytes(pointer.as_ptr(), 0, request);

        Some(pointer)
    }
}
