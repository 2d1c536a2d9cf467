//! Platform
//!
//! The Platform trait is used to extend the heap, and to discover the page size. By abstracting the underlying
//! platform, it becomes possible to easily port the code to a different OS, or even to a bare-metal target.

use core::ptr::NonNull;

use super::PowerOf2;

/// Abstraction of the platform specific heap-extension primitive.
///
/// #   Safety
///
/// Implementers guarantee that any range returned by `extend` is valid for reads and writes, is not handed out to
/// anyone else, and remains valid for as long as the implementer itself lives.
pub unsafe trait Platform {
    /// Extends the heap by `increment` bytes, and returns a pointer to the first byte of the fresh range.
    ///
    /// Returns None if the request cannot be satisfied.
    ///
    /// The fresh range may, or may not, directly follow the range returned by the previous call; the caller is
    /// expected to check. No alignment is guaranteed.
    ///
    /// #   Safety
    ///
    /// `extend` assumes that `increment` is non-zero.
    unsafe fn extend(&self, increment: usize) -> Option<NonNull<u8>>;

    /// Returns the size of a page.
    ///
    /// The allocator queries it at most once, and caches it.
    fn page_size(&self) -> PowerOf2;
}
