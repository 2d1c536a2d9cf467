//! Chunk
//!
//! A chunk is a contiguous range of heap memory, delimited by boundary tags:
//!
//! -   The header, the first word, holds the size of the chunk, including overhead, and its tag.
//! -   The footer, the last word, mirrors the size and the in-use bit, so that the chunk preceding any chunk may be
//!     located in O(1).
//!
//! While free, the two words following the header hold the forward and backward links of the list the chunk is in.
//! While in use, the same storage belongs to the caller, except on the returned list which only uses the forward link.
//!
//! Chunks are placed so that their header sits one word past a multiple of `ChunkSize::ALIGNMENT`, which makes their
//! payload, the word following the header, aligned.

use core::ptr::NonNull;

use crate::ChunkSize;

const WORD: usize = ChunkSize::WORD;

const IN_USE: usize = 0b01;
const CLEAN: usize = 0b10;
const FLAGS: usize = IN_USE | CLEAN;

//  The sentinel: an in-use header or footer, of size 0.
const SENTINEL: usize = IN_USE;

/// The state of a chunk, as recorded in its header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Tag {
    /// Free, in a dirty list or not filed at all.
    Free,
    /// Free, in a clean list.
    Clean,
    /// Handed out to a caller, or on the returned list.
    InUse,
}

/// A pointer to the header of a chunk.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Chunk(NonNull<u8>);

impl Chunk {
    /// Creates an instance from the address of its header.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `at` points to heap memory managed by the allocator, one word past an aligned address.
    pub(crate) unsafe fn from_raw(at: NonNull<u8>) -> Self {
        debug_assert!(at.as_ptr() as usize % ChunkSize::ALIGNMENT == WORD);

        Self(at)
    }

    /// Creates an instance from the address of its payload.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `payload` was handed out by the allocator.
    pub(crate) unsafe fn from_payload(payload: NonNull<u8>) -> Self {
        debug_assert!(payload.as_ptr() as usize % ChunkSize::ALIGNMENT == 0);

        Self(NonNull::new_unchecked(payload.as_ptr().sub(WORD)))
    }

    /// Returns the address of the header.
    pub(crate) fn address(&self) -> usize { self.0.as_ptr() as usize }

    /// Returns a pointer to the header.
    pub(crate) fn as_ptr(&self) -> *mut u8 { self.0.as_ptr() }

    /// Returns a pointer to the payload.
    pub(crate) fn payload(&self) -> NonNull<u8> {
        //  Safety:
        //  -   The header is followed by at least 3 words, as per the minimum chunk size.
        unsafe { NonNull::new_unchecked(self.as_ptr().add(WORD)) }
    }

    /// Returns the raw header word.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is valid.
    pub(crate) unsafe fn header(&self) -> usize { self.word(0).read() }

    /// Returns the raw footer word.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is valid.
    pub(crate) unsafe fn footer(&self) -> usize { self.word(self.size() - WORD).read() }

    /// Returns the size of the chunk, overhead included.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is valid.
    pub(crate) unsafe fn size(&self) -> usize { self.header() & !FLAGS }

    /// Returns the tag of the chunk.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is valid.
    pub(crate) unsafe fn tag(&self) -> Tag {
        let header = self.header();

        if header & IN_USE != 0 {
            Tag::InUse
        } else if header & CLEAN != 0 {
            Tag::Clean
        } else {
            Tag::Free
        }
    }

    /// Writes both header and footer.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `size` bytes starting at the header belong to this chunk.
    /// -   Assumes that `size` is a multiple of `ChunkSize::ALIGNMENT`, no less than `ChunkSize::MINIMUM`.
    pub(crate) unsafe fn set(&self, size: usize, tag: Tag) {
        debug_assert!(size >= ChunkSize::MINIMUM.value(), "{} too small", size);
        debug_assert!(size % ChunkSize::ALIGNMENT == 0, "{} misaligned", size);

        let (header, footer) = match tag {
            Tag::Free => (size, size),
            Tag::Clean => (size | CLEAN, size),
            Tag::InUse => (size | IN_USE, size | IN_USE),
        };

        self.word(0).write(header);
        self.word(size - WORD).write(footer);
    }

    /// Rewrites the tag, keeping the size.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is valid.
    pub(crate) unsafe fn set_tag(&self, tag: Tag) { self.set(self.size(), tag) }

    /// Returns the chunk physically following this one.
    ///
    /// This may be the sentinel closing the heap, which is always in use.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is valid.
    pub(crate) unsafe fn next(&self) -> Chunk { self.at(self.size()) }

    /// Returns the chunk physically preceding this one, if it is free.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is valid.
    pub(crate) unsafe fn previous_free(&self) -> Option<Chunk> {
        let footer = self.as_ptr().sub(WORD).cast::<usize>().read();

        if footer & IN_USE != 0 {
            return None;
        }

        let previous = NonNull::new_unchecked(self.as_ptr().sub(footer));

        Some(Chunk(previous))
    }

    /// Returns the chunk starting `offset` bytes past this one.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `offset` is a multiple of `ChunkSize::ALIGNMENT`.
    /// -   Assumes that the resulting address is within the heap.
    pub(crate) unsafe fn at(&self, offset: usize) -> Chunk {
        debug_assert!(offset % ChunkSize::ALIGNMENT == 0);

        Chunk(NonNull::new_unchecked(self.as_ptr().add(offset)))
    }

    /// Returns the forward link.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is in a list.
    pub(crate) unsafe fn forward(&self) -> Option<Chunk> { NonNull::new(self.word(WORD).read() as *mut u8).map(Chunk) }

    /// Sets the forward link.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is free, or on the returned list.
    pub(crate) unsafe fn set_forward(&self, forward: Option<Chunk>) { self.word(WORD).write(Self::link(forward)) }

    /// Returns the backward link.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is in a free list.
    pub(crate) unsafe fn backward(&self) -> Option<Chunk> {
        NonNull::new(self.word(2 * WORD).read() as *mut u8).map(Chunk)
    }

    /// Sets the backward link.
    ///
    /// #   Safety
    ///
    /// -   Assumes the chunk is free.
    pub(crate) unsafe fn set_backward(&self, backward: Option<Chunk>) {
        self.word(2 * WORD).write(Self::link(backward))
    }

    /// Writes a sentinel word at `at`.
    ///
    /// A sentinel reads as an in-use footer to the chunk following it, and as an in-use header of size 0 to the chunk
    /// preceding it, preventing consolidation across the boundaries of the heap.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `at` is valid for writes of one word, and word-aligned.
    pub(crate) unsafe fn write_sentinel(at: NonNull<u8>) { at.as_ptr().cast::<usize>().write(SENTINEL) }

    /// Returns whether the header is a sentinel.
    ///
    /// #   Safety
    ///
    /// -   Assumes the header is readable.
    #[cfg(test)]
    pub(crate) unsafe fn is_sentinel(&self) -> bool { self.header() == SENTINEL }

    fn link(chunk: Option<Chunk>) -> usize { chunk.map(|c| c.address()).unwrap_or(0) }

    unsafe fn word(&self, offset: usize) -> *mut usize {
        debug_assert!(offset % WORD == 0);

        self.as_ptr().add(offset).cast()
    }
}
