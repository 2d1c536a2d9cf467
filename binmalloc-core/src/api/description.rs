//! Description of the sizes of chunks, and of their classification in bins.

use core::mem;

pub use crate::utils::PowerOf2;

const WORD: usize = mem::size_of::<usize>();

//  Number of bins holding chunks of a single size.
const SMALL_BINS: usize = 64;

/// ChunkSize
///
/// The size of a chunk, including the header and footer overhead.
///
/// A chunk size is always a multiple of `ChunkSize::ALIGNMENT`, and never less than `ChunkSize::MINIMUM`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ChunkSize(usize);

impl ChunkSize {
    /// The size of a word: the header and footer are each one word.
    pub const WORD: usize = WORD;

    /// The minimum alignment of any allocation, and the granularity of chunk sizes.
    pub const ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(2 * WORD) };

    /// The overhead of a chunk: its header and its footer.
    pub const OVERHEAD: usize = 2 * WORD;

    /// The minimum size of a chunk: header, footer, and two list links.
    pub const MINIMUM: ChunkSize = ChunkSize(4 * WORD);

    /// Returns the chunk size required to satisfy a request of `request` bytes.
    ///
    /// Requests for 0 bytes, or for impossibly large amounts (top bit set), are normalized to the minimum size.
    pub const fn from_request(request: usize) -> ChunkSize {
        if request == 0 || request > isize::MAX as usize {
            return Self::MINIMUM;
        }

        let size = Self::ALIGNMENT.round_up(request + Self::OVERHEAD);

        if size < Self::MINIMUM.0 { Self::MINIMUM } else { ChunkSize(size) }
    }

    /// Creates an instance from a raw size.
    ///
    /// #   Safety
    ///
    /// Assumes that `size` is a multiple of `ChunkSize::ALIGNMENT`, and no less than `ChunkSize::MINIMUM`.
    pub const unsafe fn new_unchecked(size: usize) -> ChunkSize { ChunkSize(size) }

    /// Returns the underlying value.
    pub const fn value(&self) -> usize { self.0 }

    /// Returns the number of bytes usable by the caller, once allocated.
    pub const fn usable(&self) -> usize { self.0 - Self::OVERHEAD }

    /// Returns the bin this size is classified in.
    pub fn bin(&self) -> BinIndex { BinIndex::of(*self) }
}

/// BinIndex
///
/// The index of the bin a free chunk is filed in, based on its size.
///
/// -   Small chunks, less than 64 alignment units, are binned by exact size: one bin per alignment unit.
/// -   Larger chunks are binned approximately: four bins per power-of-2 octave, each starting at a quarter of the
///     octave, with the last bin catching everything too large for the others.
///
/// The classification is monotonic: a larger size never maps to a lower index.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BinIndex(usize);

impl BinIndex {
    /// The number of bins.
    pub const NUMBER: usize = 128;

    /// Returns the index of the bin of `size`.
    pub fn of(size: ChunkSize) -> BinIndex {
        let size = size.value();

        if size < SMALL_BINS << ChunkSize::ALIGNMENT.shift() {
            return BinIndex(size >> ChunkSize::ALIGNMENT.shift());
        }

        //  Highest bit set; at least 10 on 64 bits.
        let high = (mem::size_of::<usize>() * 8 - 1) - size.leading_zeros() as usize;
        let quadrant = (size >> (high - 2)) & 3;
        let octave = high - (SMALL_BINS << ChunkSize::ALIGNMENT.shift()).trailing_zeros() as usize;

        let index = SMALL_BINS + octave * 4 + quadrant;

        BinIndex(if index < Self::NUMBER { index } else { Self::NUMBER - 1 })
    }

    /// Creates an instance.
    ///
    /// #   Safety
    ///
    /// Assumes that `index` is less than `BinIndex::NUMBER`.
    pub const unsafe fn new_unchecked(index: usize) -> BinIndex { BinIndex(index) }

    /// Returns the underlying value.
    pub const fn value(&self) -> usize { self.0 }

    /// Returns whether the bin only ever contains chunks of a single size.
    pub const fn is_exact(&self) -> bool { self.0 < SMALL_BINS }

    /// Returns the next bin, wrapping around.
    pub const fn wrapping_next(&self) -> BinIndex { BinIndex((self.0 + 1) % Self::NUMBER) }
}

#[cfg(test)]
mod tests {

use super::*;

#[cfg(target_pointer_width = "64")]
#[test]
fn chunk_size_constants() {
    assert_eq!(8, ChunkSize::WORD);
    assert_eq!(16, ChunkSize::ALIGNMENT.value());
    assert_eq!(16, ChunkSize::OVERHEAD);
    assert_eq!(32, ChunkSize::MINIMUM.value());
}

#[cfg(target_pointer_width = "64")]
#[test]
fn chunk_size_from_request() {
    fn size(request: usize) -> usize { ChunkSize::from_request(request).value() }

    assert_eq!(32, size(0));
    assert_eq!(32, size(1));
    assert_eq!(32, size(16));
    assert_eq!(48, size(17));
    assert_eq!(48, size(32));
    assert_eq!(80, size(64));
    assert_eq!(1024, size(1000));
    assert_eq!(4112, size(4096));

    assert_eq!(32, size(isize::MAX as usize + 1));
    assert_eq!(32, size(usize::MAX));
}

#[test]
fn chunk_size_usable() {
    for request in 0..=256 {
        let size = ChunkSize::from_request(request);

        assert!(size.usable() >= request, "{} < {}", size.usable(), request);
        assert!(size.usable() < request + ChunkSize::ALIGNMENT.value() || size == ChunkSize::MINIMUM);
        assert_eq!(0, size.value() % ChunkSize::ALIGNMENT);
    }
}

#[cfg(target_pointer_width = "64")]
#[test]
fn bin_index_of_small() {
    fn index(size: usize) -> usize { BinIndex::of(unsafe { ChunkSize::new_unchecked(size) }).value() }

    assert_eq!(2, index(32));
    assert_eq!(3, index(48));
    assert_eq!(4, index(64));
    assert_eq!(62, index(992));
    assert_eq!(63, index(1008));

    assert!(BinIndex(63).is_exact());
    assert!(!BinIndex(64).is_exact());
}

#[cfg(target_pointer_width = "64")]
#[test]
fn bin_index_of_large() {
    fn index(size: usize) -> usize { BinIndex::of(unsafe { ChunkSize::new_unchecked(size) }).value() }

    assert_eq!(64, index(1024));
    assert_eq!(64, index(1264));
    assert_eq!(65, index(1280));
    assert_eq!(66, index(1536));
    assert_eq!(67, index(1792));
    assert_eq!(67, index(2032));
    assert_eq!(68, index(2048));
    assert_eq!(72, index(4096));
    assert_eq!(72, index(4112));
    assert_eq!(80, index(16 * 1024));

    assert_eq!(127, index(1 << 26));
    assert_eq!(127, index(1 << 40));
    assert_eq!(127, index(usize::MAX & !15));
}

#[test]
fn bin_index_monotonic() {
    let mut previous = BinIndex::of(ChunkSize::MINIMUM);

    let mut size = ChunkSize::MINIMUM.value();

    while size < 1 << 20 {
        let current = BinIndex::of(unsafe { ChunkSize::new_unchecked(size) });

        assert!(current >= previous, "{} maps to {:?}, below {:?}", size, current, previous);
        assert!(current.value() <= previous.value() + 1, "{} skipped a bin", size);

        previous = current;
        size += ChunkSize::ALIGNMENT.value();
    }
}

#[test]
fn bin_index_wrapping_next() {
    assert_eq!(BinIndex(3), BinIndex(2).wrapping_next());
    assert_eq!(BinIndex(0), BinIndex(127).wrapping_next());
}

}
