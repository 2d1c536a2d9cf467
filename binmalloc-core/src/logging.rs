//! Diagnostics.
//!
//! Forwards to the `log` facade when the `log` feature is enabled, and compiles to nothing otherwise. An allocator
//! installed as the global allocator cannot call into a logger which may itself allocate.

#[cfg(feature = "log")]
macro_rules! trace {
    ($($arg:tt)+) => { log::trace!($($arg)+) };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($arg:tt)+) => { { if false { let _ = format_args!($($arg)+); } } };
}
