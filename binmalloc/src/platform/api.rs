//! API of OS required services.

use core::fmt;

/// Abstraction over the diagnostic stream, to which statistics are printed.
///
/// Writing to the stream must not allocate.
pub(crate) trait DiagnosticStream : fmt::Write {
    /// Opens the stream.
    fn open() -> Self;
}
