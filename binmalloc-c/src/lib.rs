#![deny(missing_docs)]

//! Exposition of BinAllocator API via a C ABI.
//!
//! All functions operate on a single process-wide heap.

use core::{ffi::c_void, ptr::{self, NonNull}};

use binmalloc::BinAllocator;

/// Allocates at least `size` bytes of memory, aligned on 16 bytes.
///
/// A `size` of 0 yields a unique, non-NULL, pointer. Returns NULL if the heap cannot be extended.
#[no_mangle]
pub extern "C" fn bm_malloc(size: usize) -> *mut c_void { into_raw(ALLOCATOR.allocate(size)) }

/// Releases the memory located at `pointer`; NULL is a no-op.
///
/// #   Safety
///
/// -   Assumes `pointer` has been returned by a prior call to one of the allocating functions of this library.
/// -   Assumes `pointer` has not been released since its allocation.
/// -   Assumes the memory pointed by `pointer` is no longer in use.
#[no_mangle]
pub unsafe extern "C" fn bm_free(pointer: *mut c_void) { ALLOCATOR.release(from_raw(pointer)) }

/// Releases the memory located at `pointer`; an alias of `bm_free`.
///
/// #   Safety
///
/// See `bm_free`.
#[no_mangle]
pub unsafe extern "C" fn bm_cfree(pointer: *mut c_void) { ALLOCATOR.cfree(from_raw(pointer)) }

/// Resizes the block located at `pointer` to at least `size` bytes, preserving its content up to `size`.
///
/// If `pointer` is NULL, behaves as `bm_malloc`. On failure, returns NULL and leaves the block untouched.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to one of the allocating functions of this
///     library and not released since.
#[no_mangle]
pub unsafe extern "C" fn bm_realloc(pointer: *mut c_void, size: usize) -> *mut c_void {
    into_raw(ALLOCATOR.resize(from_raw(pointer), size))
}

/// Allocates zeroed memory for `count` elements of `size` bytes each.
///
/// Returns NULL if `count * size` overflows, or if the heap cannot be extended.
#[no_mangle]
pub extern "C" fn bm_calloc(count: usize, size: usize) -> *mut c_void {
    into_raw(ALLOCATOR.allocate_zeroed(count, size))
}

/// Allocates at least `size` bytes of memory, aligned on at least `alignment`.
#[no_mangle]
pub extern "C" fn bm_memalign(alignment: usize, size: usize) -> *mut c_void {
    into_raw(ALLOCATOR.allocate_aligned(alignment, size))
}

/// Allocates at least `size` bytes of memory, aligned on the page size.
#[no_mangle]
pub extern "C" fn bm_valloc(size: usize) -> *mut c_void { into_raw(ALLOCATOR.allocate_page_aligned(size)) }

/// Returns the number of usable bytes of the block located at `pointer`, or 0.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to one of the allocating functions of this
///     library.
#[no_mangle]
pub unsafe extern "C" fn bm_malloc_usable_size(pointer: *mut c_void) -> usize {
    ALLOCATOR.usable_size(from_raw(pointer))
}

/// Prints the total memory obtained from the system, and the memory in use, to the standard error.
#[cold]
#[no_mangle]
pub extern "C" fn bm_malloc_stats() { ALLOCATOR.print_stats() }

//
//  Implementation
//

static ALLOCATOR: BinAllocator = BinAllocator::new();

fn into_raw(pointer: Option<NonNull<u8>>) -> *mut c_void {
    pointer.map(|p| p.as_ptr() as *mut c_void).unwrap_or(ptr::null_mut())
}

fn from_raw(pointer: *mut c_void) -> Option<NonNull<u8>> { NonNull::new(pointer as *mut u8) }

#[cfg(test)]
mod tests {

use serial_test::serial;

use binmalloc_test::{check_pattern, pattern};

use super::*;

#[serial]
#[test]
fn malloc_free() {
    let pointer = bm_malloc(40);

    assert!(!pointer.is_null());
    assert_eq!(0, pointer as usize % 16);

    unsafe {
        assert!(bm_malloc_usable_size(pointer) >= 40);
        bm_free(pointer);
    }
}

#[serial]
#[test]
fn free_null() {
    unsafe {
        bm_free(ptr::null_mut());
        bm_cfree(ptr::null_mut());

        assert_eq!(0, bm_malloc_usable_size(ptr::null_mut()));
    }
}

#[serial]
#[test]
fn realloc() {
    unsafe {
        let pointer = bm_realloc(ptr::null_mut(), 24);
        assert!(!pointer.is_null());

        pattern(pointer as *mut u8, 24, 9);

        let pointer = bm_realloc(pointer, 5000);
        assert!(!pointer.is_null());
        assert_eq!(None, check_pattern(pointer as *const u8, 24, 9));

        bm_cfree(pointer);
    }
}

#[serial]
#[test]
fn calloc() {
    let pointer = bm_calloc(10, 10);

    assert!(!pointer.is_null());
    assert_eq!(None, (0..100).find(|&i| unsafe { (pointer as *const u8).add(i).read() } != 0));

    assert!(bm_calloc(usize::MAX, 3).is_null());

    unsafe { bm_free(pointer) };
}

#[serial]
#[test]
fn memalign_valloc() {
    let aligned = bm_memalign(512, 10);
    let paged = bm_valloc(10);

    assert_eq!(0, aligned as usize % 512);
    assert_eq!(0, paged as usize % 4096);

    bm_malloc_stats();

    unsafe {
        bm_free(aligned);
        bm_free(paged);
    }
}

}
