//! Implementation of Linux specific calls.

use core::{cell::Cell, fmt, ptr};

use binmalloc_core::{Configuration, Platform, PowerOf2};

use super::DiagnosticStream;

/// Implementation of the Configuration trait, for Linux.
#[derive(Default)]
pub(crate) struct BinConfiguration;

impl Configuration for BinConfiguration {
    //  8 KB
    const SYSTEM_UNIT: PowerOf2 = unsafe { PowerOf2::new_unchecked(8 * 1024) };

    const MAX_PREALLOCS: usize = 5;
}

/// Implementation of the Platform trait, for Linux.
///
/// Emulates a program break on top of large `mmap` reservations, leaving the actual program break to the C library.
/// Consecutive extensions are contiguous, as long as they fit within the current reservation.
#[derive(Default)]
pub(crate) struct BinPlatform {
    //  Next address to hand out, within the current reservation.
    cursor: Cell<usize>,
    //  End of the current reservation.
    limit: Cell<usize>,
}

impl BinPlatform {
    //  Address space reserved at once; only the pages touched are ever committed.
    #[cfg(target_pointer_width = "64")]
    const RESERVATION: usize = 1 << 32;

    #[cfg(not(target_pointer_width = "64"))]
    const RESERVATION: usize = 1 << 28;

    /// Creates an instance.
    pub(crate) const fn new() -> Self { Self { cursor: Cell::new(0), limit: Cell::new(0) } }
}

unsafe impl Platform for BinPlatform {
    unsafe fn extend(&self, increment: usize) -> Option<ptr::NonNull<u8>> {
        debug_assert!(increment > 0);

        let (cursor, limit) = (self.cursor.get(), self.limit.get());

        if limit - cursor < increment {
            let size = if increment > Self::RESERVATION { self.page_size().checked_round_up(increment)? } else {
                Self::RESERVATION
            };

            let start = mmap_reserve(size)?.as_ptr() as usize;

            self.cursor.set(start);
            self.limit.set(start + size);
        }

        let cursor = self.cursor.get();
        self.cursor.set(cursor + increment);

        ptr::NonNull::new(cursor as *mut u8)
    }

    fn page_size(&self) -> PowerOf2 {
        const FALLBACK: PowerOf2 = unsafe { PowerOf2::new_unchecked(4096) };

        //  Safety:
        //  -   `sysconf` has no pre-condition.
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

        if page_size <= 0 {
            return FALLBACK;
        }

        PowerOf2::new(page_size as usize).unwrap_or(FALLBACK)
    }
}

/// Implementation of the DiagnosticStream trait, for Linux: the standard error.
pub(crate) struct BinStderr;

impl DiagnosticStream for BinStderr {
    fn open() -> Self { Self }
}

impl fmt::Write for BinStderr {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut bytes = s.as_bytes();

        while !bytes.is_empty() {
            //  Safety:
            //  -   `bytes` is valid for reads of `bytes.len()` bytes.
            let written = unsafe {
                libc::write(libc::STDERR_FILENO, bytes.as_ptr() as *const libc::c_void, bytes.len())
            };

            if written <= 0 {
                return Err(fmt::Error);
            }

            bytes = &bytes[written as usize..];
        }

        Ok(())
    }
}

//  Reserves `size` bytes of address space, committed lazily on first touch.
fn mmap_reserve(size: usize) -> Option<ptr::NonNull<u8>> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE;

    //  Safety:
    //  -   No address hint, and an fd of -1 and offset of 0 as expected with MAP_ANONYMOUS.
    let result = unsafe { libc::mmap(ptr::null_mut(), size, prot, flags, -1, 0) };

    if result == libc::MAP_FAILED {
        return None;
    }

    ptr::NonNull::new(result as *mut u8)
}
