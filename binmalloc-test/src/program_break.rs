//! A simulated program break.

use std::{cell::Cell, ops::Range, ptr::NonNull, slice};

/// ProgramBreak
///
/// Hands out consecutive ranges of a pre-allocated buffer, in the manner of `sbrk`:
///
/// -   Consecutive successful calls to `sbrk` return contiguous ranges, unless `skip` was called in-between.
/// -   `sbrk` fails once the buffer, or the configured limit, is exhausted, or when failures were requested.
///
/// The memory is zeroed on creation, and released when the instance is dropped; any pointer handed out dangles then.
pub struct ProgramBreak {
    storage: NonNull<u128>,
    words: usize,
    //  Offset of the first byte handed out, relative to `storage`.
    start: usize,
    //  Offset of the current break, relative to `storage`.
    current: Cell<usize>,
    //  Maximum offset of the break, relative to `storage`.
    limit: Cell<usize>,
    failures: Cell<usize>,
    calls: Cell<usize>,
}

impl ProgramBreak {
    /// Creates an instance able to hand out up to `capacity` bytes.
    ///
    /// The first range handed out is aligned on 16 bytes.
    pub fn new(capacity: usize) -> Self { Self::with_offset(capacity, 0) }

    /// Creates an instance able to hand out up to `capacity` bytes, starting `offset` bytes past a 16-bytes boundary.
    ///
    /// Useful to check that the user of the break does not assume any alignment of the ranges it is handed.
    pub fn with_offset(capacity: usize, offset: usize) -> Self {
        const WORD: usize = std::mem::size_of::<u128>();

        let words = (capacity + offset + WORD - 1) / WORD;
        let storage = vec![0u128; words].into_boxed_slice();

        //  Safety:
        //  -   A Box is never null.
        let storage = unsafe { NonNull::new_unchecked(Box::into_raw(storage) as *mut u128) };

        let limit = Cell::new(words * WORD);

        let (current, failures, calls) = (Cell::new(offset), Cell::new(0), Cell::new(0));

        Self { storage, words, start: offset, current, limit, failures, calls }
    }

    /// Moves the break by `increment` bytes, and returns the previous break.
    ///
    /// Returns None, without moving the break, if the request cannot be satisfied.
    pub fn sbrk(&self, increment: usize) -> Option<NonNull<u8>> {
        self.calls.set(self.calls.get() + 1);

        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return None;
        }

        let current = self.current.get();

        if increment > self.limit.get() - current {
            return None;
        }

        self.current.set(current + increment);

        //  Safety:
        //  -   `current` is within the storage, as it is less than or equal to `limit`.
        let pointer = unsafe { self.base().add(current) };

        NonNull::new(pointer)
    }

    /// Moves the break by `bytes`, as if another user of the break had extended it.
    ///
    /// The next range handed out will not be contiguous with the previous one.
    pub fn skip(&self, bytes: usize) {
        let current = self.current.get() + bytes;
        assert!(current <= self.limit.get(), "Cannot skip {} bytes, only {} left", bytes, self.available());

        self.current.set(current);
    }

    /// Causes the next `count` calls to `sbrk` to fail.
    pub fn fail_next(&self, count: usize) { self.failures.set(count); }

    /// Limits the total number of bytes which may be handed out, including those already handed out.
    pub fn set_limit(&self, bytes: usize) {
        let limit = self.start + bytes;
        assert!(limit <= self.words * std::mem::size_of::<u128>(), "Limit {} exceeds capacity", bytes);

        self.limit.set(limit);
    }

    /// Returns the number of calls made to `sbrk`, successful or not.
    pub fn calls(&self) -> usize { self.calls.get() }

    /// Returns the number of bytes handed out, or skipped, so far.
    pub fn used(&self) -> usize { self.current.get() - self.start }

    /// Returns the number of bytes which may still be handed out.
    pub fn available(&self) -> usize { self.limit.get() - self.current.get() }

    /// Returns the range of addresses handed out, or skipped, so far.
    pub fn range(&self) -> Range<usize> {
        let base = self.base() as usize;
        (base + self.start)..(base + self.current.get())
    }

    /// Returns whether `pointer` lies within the range handed out so far.
    pub fn contains(&self, pointer: *const u8) -> bool { self.range().contains(&(pointer as usize)) }

    fn base(&self) -> *mut u8 { self.storage.as_ptr() as *mut u8 }
}

impl Drop for ProgramBreak {
    fn drop(&mut self) {
        //  Safety:
        //  -   `storage` and `words` were obtained from a boxed slice, in `with_offset`.
        unsafe {
            let slice = slice::from_raw_parts_mut(self.storage.as_ptr(), self.words);
            drop(Box::from_raw(slice as *mut [u128]));
        }
    }
}
