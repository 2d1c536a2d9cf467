#![cfg_attr(not(test), no_std)]

#![deny(missing_docs)]

//! Building blocks for a boundary-tag, binned memory allocator.
//!
//! binmalloc-core contains the whole allocation engine, independent of any operating system:
//! -   A platform trait, used to extend the heap with fresh memory, and to discover the page size.
//! -   A configuration trait, used to tune heap growth and preallocation at build time.
//! -   A `Heap`, owning all allocator state: bins, returned list, last remainder, and heap-growth bookkeeping.
//!
//! The `Heap` is strictly single-threaded; it is up to the user to wrap it in a lock if it is to be shared.

#[macro_use]
mod logging;

mod api;
mod internals;
mod utils;

pub use api::*;
