//! The configuration of binmalloc-core.
//!
//! The tunables of the allocator are fixed at build time, as associated constants:
//!
//! -   The heap-growth unit: the Platform is always asked for multiples of this unit. Larger values reduce the number
//!     of calls to the Platform, at the cost of coarser-grained commitment of address space.
//! -   The maximum number of preallocated chunks: bounds how eagerly a run of same-size requests is anticipated.

use super::PowerOf2;

/// Configuration
///
/// The Configuration instance allows adjusting the tunables of the allocator.
pub trait Configuration {
    /// The unit of heap growth.
    ///
    /// Extensions of the heap are always requested as multiples of this unit.
    const SYSTEM_UNIT: PowerOf2;

    /// The maximum number of chunks preallocated when splitting a chunk for a request of the same size as the
    /// previous one.
    const MAX_PREALLOCS: usize;
}

/// DefaultConfiguration
///
/// 8 KiB growth unit, up to 5 preallocated chunks.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfiguration;

impl Configuration for DefaultConfiguration {
    const SYSTEM_UNIT: PowerOf2 = unsafe { PowerOf2::new_unchecked(8 * 1024) };
    const MAX_PREALLOCS: usize = 5;
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn default_configuration() {
    assert_eq!(8192, DefaultConfiguration::SYSTEM_UNIT.value());
    assert_eq!(5, DefaultConfiguration::MAX_PREALLOCS);
}

}
