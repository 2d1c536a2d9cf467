//! Abstraction over OS differences.

mod api;

pub(crate) use api::DiagnosticStream;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub(crate) use linux::{BinConfiguration, BinPlatform, BinStderr};
