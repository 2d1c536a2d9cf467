//! The internals of binmalloc-core.
//!
//! The internals provide all the heavy-lifting.

pub mod aligned;
pub mod bins;
pub mod chunk;
pub mod chunk_list;
pub mod engine;
pub mod growth;
pub mod resize;
pub mod stats;
