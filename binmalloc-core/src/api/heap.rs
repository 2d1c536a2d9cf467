//! Heap.
//!
//! An instance of the Heap owns all the state of an allocator: bins, returned list, last remainder, rover, and
//! heap-growth bookkeeping. Memory is obtained from its Platform, and never given back.
//!
//! The Heap is single-threaded: all operations take `&mut self`. Sharing it requires wrapping it in a lock.
//!
//! #   Misuse
//!
//! Releasing a block twice, releasing a pointer not allocated by this Heap, or writing past the usable size of a block
//! are not diagnosed. They corrupt the boundary tags or the lists, and a later operation crashes or misbehaves. Debug
//! builds check the boundary tags of released blocks.

use core::{fmt, ptr::NonNull};

use crate::{Configuration, Platform};
use crate::internals::engine::Engine;

pub use crate::internals::stats::{Counters, Statistics};

/// Heap.
pub struct Heap<C, P>(Engine<C, P>);

impl<C, P> Heap<C, P> {
    /// Creates a Heap.
    ///
    /// No memory is requested from the `platform` until the first allocation.
    pub const fn new(platform: P) -> Self { Self(Engine::new(platform)) }

    /// Returns the counters of the paths taken so far.
    pub fn counters(&self) -> Counters { *self.0.counters() }

    /// Returns the platform.
    pub fn platform(&self) -> &P { self.0.platform() }

    /// Returns the number of bytes usable in the block pointed to by `pointer`.
    ///
    /// Returns 0 if `pointer` is None, if the block is not allocated, or if its boundary tags disagree.
    ///
    /// A released block keeps its in-use tag until it is filed in a bin, by a later allocation or by `statistics`;
    /// until then, its full usable size is still reported.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `pointer` was allocated by this Heap.
    pub unsafe fn usable_size(&self, pointer: Option<NonNull<u8>>) -> usize { self.0.usable_size(pointer) }
}

impl<C, P> Heap<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Allocates a block of at least `size` bytes, aligned on `ChunkSize::ALIGNMENT`.
    ///
    /// A `size` of 0, or with its top bit set, is served as the smallest possible block.
    ///
    /// Returns None if the Platform cannot extend the heap.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        //  Safety:
        //  -   The heap is only ever manipulated through this instance.
        unsafe { self.0.allocate(size) }
    }

    /// Releases a block; None is a no-op.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `pointer` was allocated by this Heap, and not released since.
    /// -   The memory is no longer accessed after the call.
    pub unsafe fn release(&mut self, pointer: Option<NonNull<u8>>) {
        if let Some(pointer) = pointer {
            self.0.release(pointer);
        }
    }

    /// Resizes a block to at least `size` bytes, preserving its content up to the smaller of both sizes.
    ///
    /// If `pointer` is None, allocates. The block is grown in place if it is followed by enough free memory, and moved
    /// otherwise. Returns None if the block could not be resized, in which case it is left untouched.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `pointer` was allocated by this Heap, and not released since.
    /// -   If a different pointer is returned, the memory pointed to by `pointer` is no longer accessed.
    pub unsafe fn resize(&mut self, pointer: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        self.0.resize(pointer, size)
    }

    /// Allocates a zeroed block for an array of `count` elements of `size` bytes.
    ///
    /// Returns None if `count * size` overflows, or if the Platform cannot extend the heap.
    pub fn allocate_zeroed(&mut self, count: usize, size: usize) -> Option<NonNull<u8>> {
        //  Safety:
        //  -   The heap is only ever manipulated through this instance.
        unsafe { self.0.allocate_zeroed(count, size) }
    }

    /// Allocates a block of at least `size` bytes, aligned on the least common multiple of `alignment` and
    /// `ChunkSize::ALIGNMENT`.
    pub fn allocate_aligned(&mut self, alignment: usize, size: usize) -> Option<NonNull<u8>> {
        //  Safety:
        //  -   The heap is only ever manipulated through this instance.
        unsafe { self.0.allocate_aligned(alignment, size) }
    }

    /// Allocates a block of at least `size` bytes, aligned on the page size of the Platform.
    pub fn allocate_page_aligned(&mut self, size: usize) -> Option<NonNull<u8>> {
        //  Safety:
        //  -   The heap is only ever manipulated through this instance.
        unsafe { self.0.allocate_page_aligned(size) }
    }

    /// Returns the statistics of memory usage.
    ///
    /// Files all released blocks first.
    pub fn statistics(&mut self) -> Statistics {
        //  Safety:
        //  -   The heap is only ever manipulated through this instance.
        unsafe { self.0.statistics() }
    }

    /// Writes the statistics of memory usage to `sink`.
    pub fn report<W>(&mut self, sink: &mut W) -> fmt::Result
        where
            W: fmt::Write,
    {
        //  Safety:
        //  -   The heap is only ever manipulated through this instance.
        unsafe { self.0.report(sink) }
    }
}

impl<C, P> Default for Heap<C, P>
    where
        P: Default
{
    fn default() -> Self { Self::new(P::default()) }
}

#[cfg(test)]
mod tests {

use binmalloc_test::{check_pattern, pattern, ProgramBreak};

use crate::{ChunkSize, DefaultConfiguration, PowerOf2};

use super::*;

struct BreakPlatform(ProgramBreak);

unsafe impl Platform for BreakPlatform {
    unsafe fn extend(&self, increment: usize) -> Option<NonNull<u8>> { self.0.sbrk(increment) }

    fn page_size(&self) -> PowerOf2 { PowerOf2::new(4096).unwrap() }
}

type TestHeap = Heap<DefaultConfiguration, BreakPlatform>;

fn heap(capacity: usize) -> TestHeap { TestHeap::new(BreakPlatform(ProgramBreak::new(capacity))) }

#[test]
fn heap_release_null() {
    let mut heap = heap(64 * 1024);

    for _ in 0..3 {
        unsafe { heap.release(None) };
    }

    assert_eq!(Counters::default(), heap.counters());
    assert_eq!(Statistics::default(), heap.statistics());
    assert_eq!(0, unsafe { heap.usable_size(None) });
}

#[test]
fn heap_usable_size_after_release() {
    let mut heap = heap(64 * 1024);

    let a = heap.allocate(100).unwrap();
    assert_eq!(112, unsafe { heap.usable_size(Some(a)) });

    unsafe { heap.release(Some(a)) };

    //  Not yet filed.
    assert_eq!(112, unsafe { heap.usable_size(Some(a)) });

    let _ = heap.statistics();

    assert_eq!(0, unsafe { heap.usable_size(Some(a)) });
}

#[test]
fn heap_default_growth_unit() {
    let mut heap = heap(64 * 1024);

    let a = heap.allocate(1).unwrap();

    assert_eq!(8192, heap.statistics().acquired);
    assert_eq!(8192, heap.platform().0.used());
    assert!(unsafe { heap.usable_size(Some(a)) } >= ChunkSize::MINIMUM.usable());
}

#[test]
fn heap_mixed_workload() {
    let mut heap = heap(4 * 1024 * 1024);

    let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();

    for i in 0..400usize {
        let size = (i * 37) % 700 + 1;
        let seed = i as u8;

        match i % 5 {
            0 | 1 | 2 => {
                let pointer = heap.allocate(size).unwrap();
                unsafe { pattern(pointer.as_ptr(), size, seed) };
                live.push((pointer, size, seed));
            },
            3 if !live.is_empty() => {
                let (pointer, size, seed) = live.swap_remove(i % live.len());
                assert_eq!(None, unsafe { check_pattern(pointer.as_ptr(), size, seed) });
                unsafe { heap.release(Some(pointer)) };
            },
            4 if !live.is_empty() => {
                let index = i % live.len();
                let (pointer, old, seed) = live[index];
                let new = old + 100;

                let pointer = unsafe { heap.resize(Some(pointer), new) }.unwrap();
                assert_eq!(None, unsafe { check_pattern(pointer.as_ptr(), old, seed) });

                unsafe { pattern(pointer.as_ptr(), new, seed) };
                live[index] = (pointer, new, seed);
            },
            _ => (),
        }
    }

    for (pointer, size, seed) in live {
        assert_eq!(0, pointer.as_ptr() as usize % ChunkSize::ALIGNMENT);
        assert!(unsafe { heap.usable_size(Some(pointer)) } >= size);
        assert_eq!(None, unsafe { check_pattern(pointer.as_ptr(), size, seed) });
        unsafe { heap.release(Some(pointer)) };
    }

    //  Only the sentinels of the single, contiguous, extension remain.
    let statistics = heap.statistics();
    assert_eq!(2 * ChunkSize::WORD, statistics.in_use);
    assert_eq!(statistics.acquired, statistics.free + statistics.in_use);
}

#[test]
fn heap_report() {
    let mut heap = heap(64 * 1024);

    let _a = heap.allocate(100).unwrap();

    let mut report = String::new();
    heap.report(&mut report).unwrap();

    assert!(report.starts_with("total mem =       8192\n"), "{}", report);
    assert!(report.contains("in use    ="), "{}", report);
}

}
