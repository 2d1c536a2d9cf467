//! Engine
//!
//! The Engine owns all the state of the allocator, and implements allocation and release.
//!
//! Release is O(1): the chunk is pushed, still marked in-use, onto the returned list. All classification is deferred
//! to allocation, which searches in a strict order, each phase returning on success:
//!
//! 1.  The head of the returned list, if an exact fit.
//! 2.  The bin of the request: first dirty or last clean chunk for exact bins, exact fit among the dirty chunks
//!     otherwise. If the dirty chunks of an approximate bin are all misfits, the bin is consolidated.
//! 3.  The returned list, filing any misfit in the dirty lists.
//! 4.  The last remainder, if large enough.
//! 5.  The clean list of the bin of the request, oldest first.
//! 6.  The clean lists of larger bins, ascending.
//! 7.  A sweep of all dirty lists, starting from the rover, consolidating each chunk until one is large enough.
//! 8.  Heap growth.
//!
//! The chunk found is then split: the excess is kept as the last remainder, possibly after carving out preallocated
//! chunks when the request has the same size as the previous one.

use core::{cmp, marker::PhantomData, ptr::NonNull};

use crate::{BinIndex, ChunkSize, Configuration, Platform, PowerOf2};

use super::{
    bins::BinTable,
    chunk::{Chunk, Tag},
    growth::Growth,
    stats::Counters,
};

const MINIMUM: usize = ChunkSize::MINIMUM.value();

/// Engine
pub(crate) struct Engine<C, P> {
    pub(super) bins: BinTable,
    //  Released chunks, not yet filed, linked through their forward link.
    pub(super) returned: Option<Chunk>,
    pub(super) last_remainder: Option<Chunk>,
    pub(super) rover: BinIndex,
    pub(super) previous_request: usize,
    pub(super) growth: Growth,
    pub(super) page_size: Option<PowerOf2>,
    pub(super) counters: Counters,
    pub(super) platform: P,
    _configuration: PhantomData<C>,
}

impl<C, P> Engine<C, P> {
    /// Creates an instance, which has not obtained any memory yet.
    pub(crate) const fn new(platform: P) -> Self {
        Self {
            bins: BinTable::new(),
            returned: None,
            last_remainder: None,
            //  Safety:
            //  -   0 is less than BinIndex::NUMBER.
            rover: unsafe { BinIndex::new_unchecked(0) },
            previous_request: 0,
            growth: Growth::new(),
            page_size: None,
            counters: Counters::new(),
            platform,
            _configuration: PhantomData,
        }
    }

    /// Returns the counters.
    pub(crate) fn counters(&self) -> &Counters { &self.counters }

    /// Returns the platform.
    pub(crate) fn platform(&self) -> &P { &self.platform }
}

impl<C, P> Engine<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Allocates a block of at least `request` bytes.
    ///
    /// Returns None if the heap cannot be grown.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the heap is not corrupted.
    pub(crate) unsafe fn allocate(&mut self, request: usize) -> Option<NonNull<u8>> {
        let size = ChunkSize::from_request(request);

        self.counters.requests += 1;

        if let Some(chunk) = self.pop_returned_exact(size) {
            self.counters.fast_hits += 1;
            return Some(chunk.payload());
        }

        self.counters.searches += 1;

        let victim = self.search(size)?;

        Some(self.split(victim, size).payload())
    }

    /// Releases a block.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `pointer` was allocated by this instance, and not released since.
    pub(crate) unsafe fn release(&mut self, pointer: NonNull<u8>) {
        let chunk = Chunk::from_payload(pointer);

        debug_assert_eq!(Tag::InUse, chunk.tag(), "{:?} not allocated", pointer);
        debug_assert_eq!(chunk.header(), chunk.footer(), "{:?} corrupted", pointer);

        self.push_returned(chunk);
    }

    /// Returns the page size, querying the platform on first use.
    pub(crate) fn page_size(&mut self) -> PowerOf2 {
        if let Some(page_size) = self.page_size {
            return page_size;
        }

        let page_size = self.platform.page_size();
        self.page_size = Some(page_size);

        page_size
    }

    /// Files the last remainder, if any, in its dirty list.
    pub(crate) unsafe fn evict_remainder(&mut self) {
        if let Some(remainder) = self.last_remainder.take() {
            self.bins.file_dirty(remainder);
        }
    }

    /// Files all chunks of the returned list in their dirty lists.
    pub(crate) unsafe fn drain_returned(&mut self) {
        while let Some(chunk) = self.returned {
            self.returned = chunk.forward();
            self.bins.file_dirty(chunk);
        }
    }

    unsafe fn search(&mut self, size: ChunkSize) -> Option<Chunk> {
        let index = size.bin();

        if let Some(chunk) = self.search_bin(size, index) {
            return Some(chunk);
        }

        if let Some(chunk) = self.search_returned(size) {
            return Some(chunk);
        }

        if let Some(chunk) = self.take_remainder(size) {
            return Some(chunk);
        }

        if let Some(chunk) = self.search_clean(size, index) {
            return Some(chunk);
        }

        if let Some(chunk) = self.search_larger_clean(index) {
            return Some(chunk);
        }

        if let Some(chunk) = self.sweep(size) {
            return Some(chunk);
        }

        self.grow(size)
    }

    unsafe fn pop_returned_exact(&mut self, size: ChunkSize) -> Option<Chunk> {
        let head = self.returned?;

        if !is_exact_fit(head, size) {
            return None;
        }

        self.returned = head.forward();

        Some(head)
    }

    unsafe fn search_bin(&mut self, size: ChunkSize, index: BinIndex) -> Option<Chunk> {
        if index.is_exact() {
            if let Some(chunk) = self.bins.dirty(index).pop_front() {
                return Some(chunk);
            }

            return self.bins.clean(index).pop_back();
        }

        let dirty = self.bins.dirty(index);

        if let Some(chunk) = dirty.iter().find(|chunk| is_exact_fit(*chunk, size)) {
            dirty.unlink(chunk);
            return Some(chunk);
        }

        if !dirty.is_empty() {
            self.consolidate_bin(index);
        }

        None
    }

    unsafe fn search_returned(&mut self, size: ChunkSize) -> Option<Chunk> {
        while let Some(chunk) = self.returned {
            self.returned = chunk.forward();

            if is_exact_fit(chunk, size) {
                return Some(chunk);
            }

            self.bins.file_dirty(chunk);
        }

        None
    }

    unsafe fn take_remainder(&mut self, size: ChunkSize) -> Option<Chunk> {
        match self.last_remainder {
            Some(remainder) if remainder.size() >= size.value() => self.last_remainder.take(),
            _ => None,
        }
    }

    unsafe fn search_clean(&mut self, size: ChunkSize, index: BinIndex) -> Option<Chunk> {
        let clean = self.bins.clean(index);

        let chunk = clean.iter_rev().find(|chunk| chunk.size() >= size.value())?;
        clean.unlink(chunk);

        Some(chunk)
    }

    unsafe fn search_larger_clean(&mut self, index: BinIndex) -> Option<Chunk> {
        let max_bin = self.bins.max_bin().value();

        (index.value() + 1..=max_bin)
            .map(|i| BinIndex::new_unchecked(i))
            .find_map(|i| self.bins.clean(i).pop_back())
    }

    //  Consolidates all dirty chunks of a bin, after filing the returned list and the last remainder.
    unsafe fn consolidate_bin(&mut self, index: BinIndex) {
        trace!("consolidate bin {}", index.value());

        self.evict_remainder();
        self.drain_returned();

        while let Some(chunk) = self.bins.dirty(index).pop_front() {
            let merged = self.consolidate(chunk);
            self.bins.file_clean(merged);
        }
    }

    //  Consolidates dirty chunks across all bins, starting from the rover, until one is large enough.
    unsafe fn sweep(&mut self, size: ChunkSize) -> Option<Chunk> {
        trace!("sweep for {} bytes from bin {}", size.value(), self.rover.value());

        self.counters.sweeps += 1;

        self.evict_remainder();
        self.drain_returned();

        let mut index = self.rover;

        for _ in 0..BinIndex::NUMBER {
            while let Some(chunk) = self.bins.dirty(index).pop_front() {
                let merged = self.consolidate(chunk);

                if merged.size() >= size.value() {
                    self.rover = index;
                    return Some(merged);
                }

                self.bins.file_clean(merged);
            }

            index = index.wrapping_next();
        }

        None
    }

    /// Merges a chunk, not in any list, with all its free physical neighbours.
    ///
    /// Returns the merged chunk, free and not in any list.
    ///
    /// #   Safety
    ///
    /// -   Assumes that all free chunks other than `chunk` are filed; neither returned nor the last remainder.
    pub(crate) unsafe fn consolidate(&mut self, chunk: Chunk) -> Chunk {
        let mut chunk = chunk;
        let mut size = chunk.size();

        while let Some(previous) = chunk.previous_free() {
            self.bins.unlink(previous);
            size += previous.size();
            chunk = previous;
        }

        loop {
            let next = chunk.at(size);

            if next.tag() == Tag::InUse {
                break;
            }

            self.bins.unlink(next);
            size += next.size();
        }

        chunk.set(size, Tag::Free);
        chunk
    }

    unsafe fn grow(&mut self, size: ChunkSize) -> Option<Chunk> {
        let (chunk, contiguous) = self.growth.extend::<C, P>(size, &self.platform)?;

        trace!("grow {} bytes at {:#x}, contiguous: {}", chunk.size(), chunk.address(), contiguous);

        self.counters.growths += 1;

        if !contiguous {
            return Some(chunk);
        }

        let previous = match chunk.previous_free() {
            Some(previous) => previous,
            None => return Some(chunk),
        };

        //  Growth only ever follows a sweep, which files the last remainder.
        debug_assert!(self.last_remainder.is_none());

        self.bins.unlink(previous);
        previous.set(previous.size() + chunk.size(), Tag::Free);

        Some(previous)
    }

    //  Splits `victim`, a free chunk not in any list, to serve a request of `size`.
    unsafe fn split(&mut self, victim: Chunk, size: ChunkSize) -> Chunk {
        let total = victim.size();
        debug_assert!(total >= size.value());

        let mut room = total - size.value();

        if room < MINIMUM {
            victim.set(total, Tag::InUse);
            return victim;
        }

        self.counters.splits += 1;

        victim.set(size.value(), Tag::InUse);

        let mut rest = victim.next();

        if size.value() == self.previous_request {
            let count = cmp::min(C::MAX_PREALLOCS, (room - MINIMUM) / size.value());

            //  Pushed from the highest address down, so that they are handed out in address order.
            for i in (0..count).rev() {
                let chunk = rest.at(i * size.value());
                chunk.set(size.value(), Tag::InUse);
                self.push_returned(chunk);
            }

            self.counters.preallocated += count;

            rest = rest.at(count * size.value());
            room -= count * size.value();
        }

        self.previous_request = size.value();

        self.evict_remainder();

        rest.set(room, Tag::Free);
        self.last_remainder = Some(rest);

        victim
    }

    unsafe fn push_returned(&mut self, chunk: Chunk) {
        chunk.set_forward(self.returned);
        self.returned = Some(chunk);
    }
}

//  Returns whether `chunk` can serve `size` without leaving a usable remainder.
unsafe fn is_exact_fit(chunk: Chunk, size: ChunkSize) -> bool {
    let available = chunk.size();

    available >= size.value() && available - size.value() < MINIMUM
}

//  Safety:
//  -   The Engine exclusively owns the heap it manages; it may move to another thread along with its Platform.
unsafe impl<C, P> Send for Engine<C, P>
    where
        P: Send,
{
}
