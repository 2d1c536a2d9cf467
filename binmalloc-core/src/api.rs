//! The API of binmalloc-core.

mod configuration;
mod description;
mod heap;
mod platform;

pub use configuration::{Configuration, DefaultConfiguration};
pub use description::{BinIndex, ChunkSize, PowerOf2};
pub use heap::{Counters, Heap, Statistics};
pub use platform::Platform;
