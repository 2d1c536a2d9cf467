//! Allocator

use core::{
    alloc::{GlobalAlloc, Layout},
    cmp,
    ptr::{self, NonNull},
};

use binmalloc_core::{ChunkSize, Counters, Statistics};

use crate::{BinConfiguration, BinPlatform, BinStderr, DiagnosticStream};

type Heap = binmalloc_core::Heap<BinConfiguration, BinPlatform>;

/// Binned Allocator.
///
/// A single heap, behind a spin lock.
pub struct BinAllocator(spin::Mutex<Heap>);

impl BinAllocator {
    /// Creates an instance.
    ///
    /// No memory is reserved until the first allocation.
    pub const fn new() -> Self { Self(spin::Mutex::new(Heap::new(BinPlatform::new()))) }

    /// Allocates at least `size` bytes of memory, aligned on `ChunkSize::ALIGNMENT`.
    ///
    /// A `size` of 0 yields a valid, minimum-sized, block. Returns None if the heap cannot be extended.
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> { self.0.lock().allocate(size) }

    /// Releases the memory located at `pointer`; None is a no-op.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to an allocating method of this instance.
    /// -   Assumes `pointer` has not been released since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn release(&self, pointer: Option<NonNull<u8>>) { self.0.lock().release(pointer) }

    /// Releases the memory located at `pointer`; an alias of `release`.
    ///
    /// #   Safety
    ///
    /// See `release`.
    pub unsafe fn cfree(&self, pointer: Option<NonNull<u8>>) { self.release(pointer) }

    /// Resizes the block located at `pointer` to at least `size` bytes, preserving its content.
    ///
    /// If `pointer` is None, allocates. Returns None if the block cannot be resized, in which case it is untouched.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to an allocating method of this instance.
    /// -   Assumes `pointer` has not been released since its allocation.
    pub unsafe fn resize(&self, pointer: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        self.0.lock().resize(pointer, size)
    }

    /// Allocates zeroed memory for `count` elements of `size` bytes.
    pub fn allocate_zeroed(&self, count: usize, size: usize) -> Option<NonNull<u8>> {
        self.0.lock().allocate_zeroed(count, size)
    }

    /// Allocates at least `size` bytes of memory, aligned on at least `alignment`.
    pub fn allocate_aligned(&self, alignment: usize, size: usize) -> Option<NonNull<u8>> {
        self.0.lock().allocate_aligned(alignment, size)
    }

    /// Allocates at least `size` bytes of memory, aligned on the page size.
    pub fn allocate_page_aligned(&self, size: usize) -> Option<NonNull<u8>> {
        self.0.lock().allocate_page_aligned(size)
    }

    /// Returns the number of usable bytes of the block located at `pointer`, or 0 if it does not appear allocated.
    ///
    /// A block released since is still reported with its full size, until the heap files it.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to an allocating method of this instance.
    pub unsafe fn usable_size(&self, pointer: Option<NonNull<u8>>) -> usize { self.0.lock().usable_size(pointer) }

    /// Returns the statistics of memory usage.
    pub fn statistics(&self) -> Statistics { self.0.lock().statistics() }

    /// Returns the counters of the paths taken by the allocator.
    pub fn counters(&self) -> Counters { self.0.lock().counters() }

    /// Prints the statistics of memory usage to the standard error.
    #[cold]
    pub fn print_stats(&self) {
        let mut stream = BinStderr::open();

        //  Nothing sensible to do, should the standard error be closed.
        let _ = self.0.lock().report(&mut stream);
    }
}

impl Default for BinAllocator {
    fn default() -> Self { Self::new() }
}

unsafe impl GlobalAlloc for BinAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let pointer = if layout.align() <= ChunkSize::ALIGNMENT.value() {
            self.allocate(layout.size())
        } else {
            self.allocate_aligned(layout.align(), layout.size())
        };

        pointer.map(|p| p.as_ptr()).unwrap_or(ptr::null_mut())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _: Layout) { self.release(NonNull::new(ptr)) }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() <= ChunkSize::ALIGNMENT.value() {
            return self.allocate_zeroed(1, layout.size()).map(|p| p.as_ptr()).unwrap_or(ptr::null_mut());
        }

        let pointer = self.alloc(layout);

        if !pointer.is_null() {
            ptr::write_bytes(pointer, 0, layout.size());
        }

        pointer
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() <= ChunkSize::ALIGNMENT.value() {
            return self.resize(NonNull::new(ptr), new_size).map(|p| p.as_ptr()).unwrap_or(ptr::null_mut());
        }

        //  Resizing in place does not preserve alignments beyond the minimum, if the block moves.
        //
        //  Safety:
        //  -   `new_size` does not overflow once rounded up to `layout.align()`, as per the pre-conditions.
        let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());
        let fresh = self.alloc(new_layout);

        if !fresh.is_null() {
            ptr::copy_nonoverlapping(ptr, fresh, cmp::min(layout.size(), new_size));
            self.dealloc(ptr, layout);
        }

        fresh
    }
}
