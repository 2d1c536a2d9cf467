#![deny(missing_docs)]

//! Test helpers shared across the binmalloc crates.
//!
//! -   `ProgramBreak` simulates the heap-extension primitive over memory owned by the test, with hooks to make it fail
//!     or to leave holes between consecutive extensions.
//! -   `pattern` and `check_pattern` write and verify recognizable byte sequences, to detect content corruption.

mod program_break;

pub use program_break::ProgramBreak;

/// Fills `length` bytes at `pointer` with a sequence derived from `seed`.
///
/// #   Safety
///
/// -   Assumes that `pointer` is valid for writes of `length` bytes.
pub unsafe fn pattern(pointer: *mut u8, length: usize, seed: u8) {
    for i in 0..length {
        pointer.add(i).write(pattern_byte(i, seed));
    }
}

/// Returns the index of the first byte at `pointer` which differs from the sequence derived from `seed`, if any.
///
/// #   Safety
///
/// -   Assumes that `pointer` is valid for reads of `length` bytes.
pub unsafe fn check_pattern(pointer: *const u8, length: usize, seed: u8) -> Option<usize> {
    (0..length).find(|&i| pointer.add(i).read() != pattern_byte(i, seed))
}

fn pattern_byte(index: usize, seed: u8) -> u8 {
    (index as u8).wrapping_mul(31).wrapping_add(seed)
}
