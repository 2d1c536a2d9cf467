//! Bin Table
//!
//! 128 bins, indexed by `BinIndex`, each holding two lists of free chunks:
//!
//! -   The dirty list: chunks freed, but not yet merged with their physical neighbours.
//! -   The clean list: chunks merged with all their free physical neighbours. A clean chunk never borders another
//!     clean chunk.
//!
//! The tag of a chunk records which of the two lists of its bin it is in, so that a chunk may be unlinked knowing only
//! its address.

use crate::{BinIndex, ChunkSize};

use super::{
    chunk::{Chunk, Tag},
    chunk_list::ChunkList,
};

#[derive(Clone, Copy, Debug)]
struct Bin {
    dirty: ChunkList,
    clean: ChunkList,
}

impl Bin {
    const EMPTY: Bin = Bin { dirty: ChunkList::EMPTY, clean: ChunkList::EMPTY };
}

/// BinTable
pub(crate) struct BinTable {
    bins: [Bin; BinIndex::NUMBER],
    //  The highest bin ever filed into.
    max_bin: usize,
}

impl BinTable {
    /// Creates an empty table.
    pub(crate) const fn new() -> Self { Self { bins: [Bin::EMPTY; BinIndex::NUMBER], max_bin: 0 } }

    /// Returns the highest index of any bin ever filed into.
    pub(crate) fn max_bin(&self) -> BinIndex {
        //  Safety:
        //  -   Only ever set from a valid BinIndex.
        unsafe { BinIndex::new_unchecked(self.max_bin) }
    }

    /// Returns the dirty list of the bin.
    pub(crate) fn dirty(&mut self, index: BinIndex) -> &mut ChunkList { &mut self.bins[index.value()].dirty }

    /// Returns the clean list of the bin.
    pub(crate) fn clean(&mut self, index: BinIndex) -> &mut ChunkList { &mut self.bins[index.value()].clean }

    /// Files a free chunk in the dirty list of its bin, at the front.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `chunk` is valid, carries its size, and is not in any list.
    pub(crate) unsafe fn file_dirty(&mut self, chunk: Chunk) {
        chunk.set_tag(Tag::Free);

        let index = self.index_of(chunk);
        self.bins[index.value()].dirty.push_front(chunk);
    }

    /// Files a free chunk in the clean list of its bin, at the front.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `chunk` is valid, carries its size, and is not in any list.
    /// -   Assumes that `chunk` does not border any other clean chunk.
    pub(crate) unsafe fn file_clean(&mut self, chunk: Chunk) {
        chunk.set_tag(Tag::Clean);

        let index = self.index_of(chunk);
        self.bins[index.value()].clean.push_front(chunk);
    }

    /// Unlinks a free chunk from whichever list it is in.
    ///
    /// The chunk keeps its tag.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `chunk` is valid, and filed in this table.
    pub(crate) unsafe fn unlink(&mut self, chunk: Chunk) {
        let index = BinIndex::of(ChunkSize::new_unchecked(chunk.size()));
        let bin = &mut self.bins[index.value()];

        match chunk.tag() {
            Tag::Free => bin.dirty.unlink(chunk),
            Tag::Clean => bin.clean.unlink(chunk),
            Tag::InUse => debug_assert!(false, "Cannot unlink in-use chunk {:x}", chunk.address()),
        }
    }

    /// Returns the total size of all filed chunks.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the lists are not corrupted.
    pub(crate) unsafe fn free_bytes(&self) -> usize {
        self.bins.iter()
            .flat_map(|bin| bin.dirty.iter().chain(bin.clean.iter()))
            .map(|chunk| chunk.size())
            .sum()
    }

    unsafe fn index_of(&mut self, chunk: Chunk) -> BinIndex {
        let index = BinIndex::of(ChunkSize::new_unchecked(chunk.size()));

        if index.value() > self.max_bin {
            self.max_bin = index.value();
        }

        index
    }
}

#[cfg(test)]
mod tests {

use core::ptr::NonNull;

use super::*;

#[repr(align(16))]
struct Arena([usize; 1024]);

impl Arena {
    fn new() -> Box<Self> { Box::new(Self([0; 1024])) }

    //  Carves a chunk of `size` bytes, `index` words past the start, `index` being odd.
    fn chunk(&mut self, index: usize, size: usize) -> Chunk {
        unsafe {
            let chunk = Chunk::from_raw(NonNull::from(&mut self.0[index]).cast());
            chunk.set(size, Tag::InUse);
            chunk
        }
    }
}

fn bin(size: usize) -> BinIndex { BinIndex::of(unsafe { ChunkSize::new_unchecked(size) }) }

#[test]
fn bin_table_file() {
    let mut arena = Arena::new();
    let (small, large) = (arena.chunk(1, 64), arena.chunk(101, 2048));

    let mut table = BinTable::new();
    assert_eq!(0, table.max_bin().value());

    unsafe {
        table.file_dirty(small);
        table.file_clean(large);
    }

    assert_eq!(Tag::Free, unsafe { small.tag() });
    assert_eq!(Tag::Clean, unsafe { large.tag() });

    assert_eq!(Some(small), table.dirty(bin(64)).head());
    assert!(table.clean(bin(64)).is_empty());
    assert_eq!(Some(large), table.clean(bin(2048)).head());
    assert!(table.dirty(bin(2048)).is_empty());

    assert_eq!(bin(2048), table.max_bin());
    assert_eq!(64 + 2048, unsafe { table.free_bytes() });
}

#[test]
fn bin_table_unlink() {
    let mut arena = Arena::new();
    let (first, second) = (arena.chunk(1, 64), arena.chunk(21, 64));

    let mut table = BinTable::new();

    unsafe {
        table.file_dirty(first);
        table.file_clean(second);

        table.unlink(second);
    }

    assert!(table.clean(bin(64)).is_empty());
    assert_eq!(Some(first), table.dirty(bin(64)).head());

    unsafe { table.unlink(first) };

    assert!(table.dirty(bin(64)).is_empty());
    assert_eq!(0, unsafe { table.free_bytes() });

    //  The highest bin is never lowered.
    assert_eq!(bin(64), table.max_bin());
}

#[test]
fn bin_table_ordering() {
    let mut arena = Arena::new();
    let chunks = [arena.chunk(1, 64), arena.chunk(21, 64), arena.chunk(41, 64)];

    let mut table = BinTable::new();

    for chunk in &chunks {
        unsafe { table.file_clean(*chunk) };
    }

    //  Most recent at the head, oldest at the tail.
    assert_eq!(Some(chunks[2]), table.clean(bin(64)).head());
    assert_eq!(Some(chunks[0]), table.clean(bin(64)).tail());
}

}
