//! Introspection: counters, statistics, and usable size.

use core::{fmt, ptr::NonNull};

use crate::{ChunkSize, Configuration, Platform};

use super::{
    chunk::{Chunk, Tag},
    engine::Engine,
};

/// Counters
///
/// Tallies of the paths taken by the allocator, since its creation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    /// Number of allocation requests.
    pub requests: usize,
    /// Number of requests served by the head of the returned list.
    pub fast_hits: usize,
    /// Number of requests which searched past the head of the returned list.
    pub searches: usize,
    /// Number of chunks split, leaving a remainder.
    pub splits: usize,
    /// Number of chunks preallocated onto the returned list.
    pub preallocated: usize,
    /// Number of sweeps consolidating all bins.
    pub sweeps: usize,
    /// Number of successful extensions of the heap.
    pub growths: usize,
    /// Number of resizes completed in place.
    pub resized_in_place: usize,
}

impl Counters {
    pub(crate) const fn new() -> Self {
        Self {
            requests: 0,
            fast_hits: 0,
            searches: 0,
            splits: 0,
            preallocated: 0,
            sweeps: 0,
            growths: 0,
            resized_in_place: 0,
        }
    }
}

/// Statistics
///
/// A snapshot of the memory usage of the heap.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Statistics {
    /// Number of bytes obtained from the platform.
    pub acquired: usize,
    /// Number of bytes in free chunks.
    pub free: usize,
    /// Number of bytes not free: allocated chunks, plus the bytes lost to sentinels and alignment.
    pub in_use: usize,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total mem = {:>10}", self.acquired)?;
        writeln!(f, "in use    = {:>10}", self.in_use)
    }
}

impl<C, P> Engine<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Computes the statistics, after filing the returned list.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the heap is not corrupted.
    pub(crate) unsafe fn statistics(&mut self) -> Statistics {
        self.drain_returned();

        let remainder = self.last_remainder.map(|chunk| chunk.size()).unwrap_or(0);
        let free = self.bins.free_bytes() + remainder;
        let acquired = self.growth.acquired();

        Statistics { acquired, free, in_use: acquired - free }
    }

    /// Writes the statistics to `sink`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the heap is not corrupted.
    pub(crate) unsafe fn report<W>(&mut self, sink: &mut W) -> fmt::Result
        where
            W: fmt::Write,
    {
        let statistics = self.statistics();

        write!(sink, "{}", statistics)
    }
}

impl<C, P> Engine<C, P> {
    /// Returns the number of bytes usable in the block, or 0 if it does not appear to be allocated.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `pointer` was allocated by this instance, or is null.
    pub(crate) unsafe fn usable_size(&self, pointer: Option<NonNull<u8>>) -> usize {
        let pointer = match pointer {
            Some(pointer) => pointer,
            None => return 0,
        };

        let chunk = Chunk::from_payload(pointer);

        if chunk.tag() != Tag::InUse || chunk.size() < ChunkSize::MINIMUM.value() {
            return 0;
        }

        if chunk.header() != chunk.footer() {
            return 0;
        }

        chunk.size() - ChunkSize::OVERHEAD
    }
}
