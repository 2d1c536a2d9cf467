#![no_std]
#![deny(missing_docs)]

//! A boundary-tag, binned, memory allocator.
//!
//! The type `BinAllocator` provides a general-purpose memory allocator, usable as a drop-in replacement for the
//! global allocator, or directly through its malloc-like API.
//!
//! #   Warning
//!
//! A single heap serves all threads, behind a single spin lock: the allocator favors compactness over scalability.
//!
//! Misuse, such as double-free or writing past the end of a block, is not diagnosed: it corrupts the heap.

mod allocator;
mod platform;

pub use allocator::BinAllocator;
pub use binmalloc_core::{ChunkSize, Counters, Statistics};

use platform::{BinConfiguration, BinPlatform, BinStderr, DiagnosticStream};
